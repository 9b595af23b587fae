//! Server-Facing Relay
//!
//! Everything that talks to automation servers: envelope forwarding out,
//! registration and send requests in.

pub mod error;
pub mod forward;
pub mod register;
pub mod replay;
pub mod send;
pub mod ssrf;

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

pub use error::{RelayError, RelayResult};
pub use forward::{EnvelopeTransport, ForwardError, Forwarder};

/// Slack team id shape. Also keeps the canonical delimiter out of ids.
static TEAM_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^T[A-Z0-9]{2,}$").expect("valid regex"));

/// Whether `id` looks like a Slack team id.
pub fn is_valid_workspace_id(id: &str) -> bool {
    TEAM_ID_RE.is_match(id)
}

/// Parse a JSON body; structural failures are validation errors (400).
pub(crate) fn parse_body<T: DeserializeOwned>(body: &[u8]) -> RelayResult<T> {
    serde_json::from_slice(body).map_err(|e| RelayError::Validation(format!("Invalid body: {e}")))
}

/// Reject empty required fields, naming the first one found.
pub(crate) fn require_fields(fields: &[(&str, &str)]) -> RelayResult<()> {
    match fields.iter().find(|(_, value)| value.trim().is_empty()) {
        Some((name, _)) => Err(RelayError::Validation(format!("{name} is required"))),
        None => Ok(()),
    }
}

pub(crate) fn require_workspace_id(id: &str) -> RelayResult<()> {
    if is_valid_workspace_id(id) {
        Ok(())
    } else {
        Err(RelayError::Validation("workspace_id is malformed".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workspace_id_shape() {
        assert!(is_valid_workspace_id("T123"));
        assert!(is_valid_workspace_id("T0ABCDEF"));
        assert!(!is_valid_workspace_id("T123|evil"));
        assert!(!is_valid_workspace_id("T1"));
        assert!(!is_valid_workspace_id("t123"));
        assert!(!is_valid_workspace_id("T123\n"));
        assert!(!is_valid_workspace_id(""));
    }

    #[test]
    fn first_missing_field_is_named() {
        let err = require_fields(&[("a", "x"), ("b", " "), ("c", "")]).unwrap_err();
        assert_eq!(err.to_string(), "Validation failed: b is required");
    }
}
