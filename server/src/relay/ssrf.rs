//! Callback URL Guard
//!
//! Server callback URLs must be `https` and must not point into private or
//! reserved address space. Hostnames are checked statically at registration
//! and re-checked after DNS resolution on every forward.

use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use reqwest::Url;
use thiserror::Error;

/// Loopback hostnames that never resolve anywhere useful.
const BLOCKED_HOSTNAMES: &[&str] = &[
    "localhost",
    "localhost.localdomain",
    "ip6-localhost",
    "ip6-loopback",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SsrfError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("URL must use https")]
    InsecureScheme,

    #[error("URL has no host")]
    MissingHost,

    #[error("URL points to a private or reserved address")]
    BlockedHost,

    #[error("DNS for {host} resolved to private address {addr}")]
    PrivateResolution { host: String, addr: IpAddr },

    #[error("DNS resolution failed for {0}")]
    Resolution(String),
}

/// Parse a callback URL and apply the static checks.
pub fn validate_callback_url(raw: &str) -> Result<Url, SsrfError> {
    let url = Url::parse(raw).map_err(|e| SsrfError::InvalidUrl(e.to_string()))?;
    if url.scheme() != "https" {
        return Err(SsrfError::InsecureScheme);
    }
    let host = url.host_str().ok_or(SsrfError::MissingHost)?;
    if is_blocked_host(host) {
        return Err(SsrfError::BlockedHost);
    }
    Ok(url)
}

/// Static hostname check; DNS is resolved later by [`resolve_and_pin`].
pub fn is_blocked_host(host: &str) -> bool {
    let lower = host.to_lowercase();
    if BLOCKED_HOSTNAMES.contains(&lower.as_str()) {
        return true;
    }

    let bare = lower.trim_start_matches('[').trim_end_matches(']');
    bare.parse::<IpAddr>().is_ok_and(|ip| is_private_ip(&ip))
}

/// Private, loopback, link-local, shared, documentation or otherwise reserved.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, _] = v4.octets();
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
                || (a == 100 && (b & 0xC0) == 64) // 100.64.0.0/10
                || (a == 198 && (b & 0xFE) == 18) // 198.18.0.0/15
                || (a == 192 && b == 0 && (c == 0 || c == 2)) // 192.0.0.0/24, 192.0.2.0/24
                || (a == 198 && b == 51 && c == 100) // 198.51.100.0/24
                || (a == 203 && b == 0 && c == 113) // 203.0.113.0/24
                || a >= 224 // multicast + reserved
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                || (v6.segments()[0] & 0xFE00) == 0xFC00 // fc00::/7
                || (v6.segments()[0] & 0xFFC0) == 0xFE80 // fe80::/10
                || is_v4_mapped_private(v6)
        }
    }
}

fn is_v4_mapped_private(v6: &Ipv6Addr) -> bool {
    v6.to_ipv4_mapped()
        .is_some_and(|v4| is_private_ip(&IpAddr::V4(v4)))
}

/// A callback host with the address it was verified against.
#[derive(Debug, Clone)]
pub struct PinnedTarget {
    pub url: Url,
    pub host: String,
    pub addr: SocketAddr,
}

/// Resolve the callback host and refuse private resolutions. The returned
/// address must be pinned on the HTTP client so a second lookup cannot differ.
pub async fn resolve_and_pin(raw: &str) -> Result<PinnedTarget, SsrfError> {
    let url = validate_callback_url(raw)?;
    let host = url.host_str().ok_or(SsrfError::MissingHost)?.to_string();
    let port = url.port_or_known_default().unwrap_or(443);

    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return Ok(PinnedTarget {
            addr: SocketAddr::new(ip, port),
            url,
            host,
        });
    }

    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), port))
        .await
        .map_err(|e| SsrfError::Resolution(format!("{host}: {e}")))?
        .collect();

    if let Some(bad) = addrs.iter().find(|a| is_private_ip(&a.ip())) {
        return Err(SsrfError::PrivateResolution {
            host,
            addr: bad.ip(),
        });
    }
    let addr = *addrs
        .first()
        .ok_or_else(|| SsrfError::Resolution(format!("{host}: no addresses")))?;

    Ok(PinnedTarget { url, host, addr })
}
