//! Replay Window
//!
//! Signed requests carry Unix-second timestamps; anything further than
//! [`REPLAY_WINDOW_SECS`] from the broker clock is refused.

/// Maximum tolerated skew, in seconds, in either direction.
pub const REPLAY_WINDOW_SECS: u64 = 300;

/// Current Unix time in seconds.
pub fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// `|now - timestamp| <= REPLAY_WINDOW_SECS`.
pub fn is_fresh(timestamp: i64, now: i64) -> bool {
    now.checked_sub(timestamp)
        .is_some_and(|skew| skew.unsigned_abs() <= REPLAY_WINDOW_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_is_inclusive() {
        let now = 1_700_000_000;
        assert!(is_fresh(now, now));
        assert!(is_fresh(now - 300, now));
        assert!(is_fresh(now + 300, now));
        assert!(!is_fresh(now - 301, now));
        assert!(!is_fresh(now + 301, now));
    }

    #[test]
    fn extreme_values_are_stale() {
        assert!(!is_fresh(i64::MIN, 1_700_000_000));
        assert!(!is_fresh(i64::MAX, -1_700_000_000));
        assert!(!is_fresh(0, 1_700_000_000));
    }
}
