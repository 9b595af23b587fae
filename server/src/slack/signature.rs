//! Slack Request Signatures
//!
//! `v0=hex(HMAC-SHA256(signing_secret, "v0:{timestamp}:{body}"))`, sent in
//! `X-Slack-Signature` with the timestamp in `X-Slack-Request-Timestamp`.

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use hmac::{Hmac, Mac};
use relay_crypto::constant_time_eq;
use sha2::Sha256;
use thiserror::Error;

use crate::relay::replay::is_fresh;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-slack-signature";
pub const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
pub const RETRY_NUM_HEADER: &str = "x-slack-retry-num";

const VERSION: &str = "v0";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("Missing Slack signature headers")]
    MissingHeaders,

    #[error("Malformed Slack request timestamp")]
    MalformedTimestamp,

    #[error("Slack request timestamp outside the allowed window")]
    Stale,

    #[error("Slack signature mismatch")]
    Mismatch,
}

impl IntoResponse for SignatureError {
    fn into_response(self) -> Response {
        let status = match self {
            Self::MissingHeaders | Self::MalformedTimestamp => StatusCode::BAD_REQUEST,
            Self::Stale | Self::Mismatch => StatusCode::UNAUTHORIZED,
        };
        let body = Json(serde_json::json!({ "ok": false, "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Compute the `v0=` signature for a request.
pub fn compute(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

/// Verify a webhook request. The timestamp window is checked before any MAC
/// is computed.
pub fn verify(secret: &str, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), SignatureError> {
    let (Some(timestamp), Some(provided)) = (
        header_str(headers, TIMESTAMP_HEADER),
        header_str(headers, SIGNATURE_HEADER),
    ) else {
        return Err(SignatureError::MissingHeaders);
    };

    let ts: i64 = timestamp
        .trim()
        .parse()
        .map_err(|_| SignatureError::MalformedTimestamp)?;
    if !is_fresh(ts, now) {
        return Err(SignatureError::Stale);
    }

    let expected = compute(secret, timestamp, body);
    if constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}
