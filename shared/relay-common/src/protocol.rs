//! Relay Wire Protocol
//!
//! JSON bodies exchanged between the broker and automation servers. All
//! timestamps are Unix seconds; all keys, ciphertexts and signatures are
//! standard base64.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Header carrying the envelope signature on forwarded events.
pub const SIGNATURE_HEADER: &str = "X-Relay-Signature";

/// Header carrying the envelope timestamp on forwarded events.
pub const TIMESTAMP_HEADER: &str = "X-Relay-Timestamp";

/// Header carrying the workspace id on forwarded events.
pub const WORKSPACE_HEADER: &str = "X-Relay-Workspace";

/// Action name signed into unregister requests.
pub const UNREGISTER_ACTION: &str = "unregister";

/// Signed, sealed wrapper carrying one inbound event to a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub workspace_id: String,
    /// Sealed-box ciphertext of the raw event JSON.
    pub encrypted: String,
    pub timestamp: i64,
    /// Ed25519 signature over `workspace_id|timestamp|encrypted`.
    pub signature: String,
}

/// Platform API calls a server may ask the broker to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SendAction {
    #[serde(rename = "chat.postMessage")]
    PostMessage,
    #[serde(rename = "chat.update")]
    UpdateMessage,
    #[serde(rename = "reactions.add")]
    AddReaction,
    #[serde(rename = "reactions.remove")]
    RemoveReaction,
}

impl SendAction {
    pub const ALL: [Self; 4] = [
        Self::PostMessage,
        Self::UpdateMessage,
        Self::AddReaction,
        Self::RemoveReaction,
    ];

    /// Platform API method name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PostMessage => "chat.postMessage",
            Self::UpdateMessage => "chat.update",
            Self::AddReaction => "reactions.add",
            Self::RemoveReaction => "reactions.remove",
        }
    }
}

impl fmt::Display for SendAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SendAction {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Action name outside the allow-list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownAction(pub String);

impl fmt::Display for UnknownAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported action: {}", self.0)
    }
}

impl std::error::Error for UnknownAction {}

/// Cleartext destination metadata. Left unencrypted so the broker can route
/// without opening anything but the body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRouting {
    pub channel: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
    /// Target message timestamp (updates and reactions).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// Server → broker request to perform one platform API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendRequest {
    pub workspace_id: String,
    /// Kept as a string so unknown actions reach allow-list validation.
    pub action: String,
    pub routing: SendRouting,
    /// Authenticated-box ciphertext of a [`SendContent`] JSON document.
    pub encrypted_body: String,
    pub nonce: String,
    pub timestamp: i64,
    pub signature: String,
}

impl SendRequest {
    /// Every field except `signature`, as a JSON value for structured
    /// canonicalization.
    pub fn unsigned_value(&self) -> serde_json::Value {
        serde_json::json!({
            "workspace_id": self.workspace_id,
            "action": self.action,
            "routing": self.routing,
            "encrypted_body": self.encrypted_body,
            "nonce": self.nonce,
            "timestamp": self.timestamp,
        })
    }
}

/// Decrypted body of a send request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<serde_json::Value>,
}

/// Successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}

/// Activation request carrying the one-time registration code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub workspace_id: String,
    pub server_pubkey: String,
    pub server_signing_pubkey: String,
    pub server_callback_url: String,
    pub auth_code: String,
}

/// Broker identity returned on successful activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub ok: bool,
    pub broker_pubkey: String,
    pub broker_signing_pubkey: String,
}

/// Signed request to deactivate a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnregisterRequest {
    pub workspace_id: String,
    pub timestamp: i64,
    /// Ed25519 signature over `workspace_id|unregister|timestamp|`.
    pub signature: String,
}

/// Bare acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip_through_from_str() {
        for action in SendAction::ALL {
            assert_eq!(action.as_str().parse::<SendAction>().unwrap(), action);
        }
        assert!("files.upload".parse::<SendAction>().is_err());
    }

    #[test]
    fn action_serializes_as_method_name() {
        assert_eq!(
            serde_json::to_string(&SendAction::PostMessage).unwrap(),
            r#""chat.postMessage""#
        );
    }

    #[test]
    fn routing_omits_absent_fields() {
        let routing = SendRouting {
            channel: "C1".into(),
            ..SendRouting::default()
        };
        assert_eq!(
            serde_json::to_value(&routing).unwrap(),
            serde_json::json!({ "channel": "C1" })
        );
    }

    #[test]
    fn unsigned_value_excludes_signature() {
        let req = SendRequest {
            workspace_id: "T1".into(),
            action: "chat.postMessage".into(),
            routing: SendRouting {
                channel: "C1".into(),
                ..SendRouting::default()
            },
            encrypted_body: "Ym9keQ==".into(),
            nonce: "bm9uY2U=".into(),
            timestamp: 10,
            signature: "c2ln".into(),
        };
        let value = req.unsigned_value();
        assert!(value.get("signature").is_none());
        assert_eq!(value["routing"]["channel"], "C1");
    }
}
