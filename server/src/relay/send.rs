//! Send Handler
//!
//! `POST /api/send`: a server asks the broker to make one Slack API call.
//! Routing travels in the clear; content arrives in an authenticated box
//! that only the broker can open and that only the registered server can
//! have produced. Decrypted content lives only for the duration of the call.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use relay_common::{SendAction, SendContent, SendRequest, SendResponse, SendRouting};
use relay_crypto::{authbox, canonical, encoding, signing, types::BoxPublicKey};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use zeroize::Zeroize;

use super::error::{RelayError, RelayResult};
use super::replay::{is_fresh, now_secs};
use super::{parse_body, require_fields, require_workspace_id};
use crate::api::AppState;

/// Routing fields each action needs beyond `channel`.
fn validate_routing(action: SendAction, routing: &SendRouting) -> RelayResult<()> {
    let missing = |name: &str| RelayError::Validation(format!("routing.{name} is required for {action}"));
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    match action {
        SendAction::PostMessage => Ok(()),
        SendAction::UpdateMessage => {
            if present(&routing.ts) {
                Ok(())
            } else {
                Err(missing("ts"))
            }
        }
        SendAction::AddReaction | SendAction::RemoveReaction => {
            if !present(&routing.ts) {
                Err(missing("ts"))
            } else if !present(&routing.emoji) {
                Err(missing("emoji"))
            } else {
                Ok(())
            }
        }
    }
}

/// Build the Slack method body. Decrypted strings are moved, not copied.
fn slack_payload(action: SendAction, routing: &SendRouting, content: SendContent) -> Value {
    let mut body = Map::new();
    body.insert("channel".into(), json!(routing.channel));

    match action {
        SendAction::PostMessage | SendAction::UpdateMessage => {
            if let Some(text) = content.text {
                body.insert("text".into(), Value::String(text));
            }
            if let Some(blocks) = content.blocks {
                body.insert("blocks".into(), blocks);
            }
            if action == SendAction::PostMessage {
                if let Some(thread_ts) = &routing.thread_ts {
                    body.insert("thread_ts".into(), json!(thread_ts));
                }
            } else {
                body.insert("ts".into(), json!(routing.ts));
            }
        }
        SendAction::AddReaction | SendAction::RemoveReaction => {
            body.insert("timestamp".into(), json!(routing.ts));
            body.insert("name".into(), json!(routing.emoji));
        }
    }

    Value::Object(body)
}

/// Message actions need something to say.
fn validate_content(action: SendAction, payload: &Value) -> RelayResult<()> {
    let has_text = payload["text"].as_str().is_some_and(|t| !t.is_empty());
    let has_blocks = payload.get("blocks").is_some_and(|b| !b.is_null());
    match action {
        SendAction::PostMessage | SendAction::UpdateMessage if !(has_text || has_blocks) => Err(
            RelayError::Validation(format!("{action} requires text or blocks")),
        ),
        _ => Ok(()),
    }
}

/// Overwrite every string in a JSON value in place.
fn scrub(value: &mut Value) {
    match value {
        Value::String(s) => s.zeroize(),
        Value::Array(items) => items.iter_mut().for_each(scrub),
        Value::Object(map) => map.values_mut().for_each(scrub),
        _ => {}
    }
}

/// Dispatch one Slack API call on behalf of a registered server.
///
/// POST /api/send
#[tracing::instrument(skip(state, body))]
pub async fn send(State(state): State<AppState>, body: Bytes) -> RelayResult<Json<SendResponse>> {
    let request: SendRequest = parse_body(&body)?;
    require_fields(&[
        ("workspace_id", request.workspace_id.as_str()),
        ("action", request.action.as_str()),
        ("routing.channel", request.routing.channel.as_str()),
        ("encrypted_body", request.encrypted_body.as_str()),
        ("nonce", request.nonce.as_str()),
        ("signature", request.signature.as_str()),
    ])?;
    require_workspace_id(&request.workspace_id)?;
    let action: SendAction = request
        .action
        .parse()
        .map_err(|e: relay_common::UnknownAction| RelayError::Validation(e.to_string()))?;
    validate_routing(action, &request.routing)?;

    if !is_fresh(request.timestamp, now_secs()) {
        warn!(workspace_id = %request.workspace_id, timestamp = request.timestamp, "Stale send request");
        return Err(RelayError::StaleTimestamp);
    }

    let record = state
        .registry
        .get(&request.workspace_id)
        .await?
        .ok_or(RelayError::WorkspaceNotFound)?;
    if !record.is_active() {
        return Err(RelayError::WorkspaceInactive);
    }

    // Covers the body but not `routing`.
    let signed = canonical::request_payload(
        &request.workspace_id,
        &request.action,
        request.timestamp,
        &request.encrypted_body,
    );
    if !signing::verify(&signed, &request.signature, &record.server_signing_pubkey) {
        warn!(workspace_id = %request.workspace_id, action = %action, "Send signature rejected");
        return Err(RelayError::InvalidSignature);
    }

    let server_key = encoding::from_base64_array::<32>(&record.server_pubkey)
        .map(BoxPublicKey::from)
        .map_err(|_| RelayError::DecryptionFailed)?;
    let mut plaintext = authbox::box_decrypt(
        &request.encrypted_body,
        &request.nonce,
        &server_key,
        state.keys.box_secret(),
    )
    .map_err(|_| RelayError::DecryptionFailed)?;
    let parsed = serde_json::from_slice::<SendContent>(&plaintext);
    authbox::zero(&mut plaintext);
    let content = parsed.map_err(|_| RelayError::DecryptionFailed)?;

    let mut payload = slack_payload(action, &request.routing, content);
    let outcome = match validate_content(action, &payload) {
        Ok(()) => dispatch(&state, &record, action, &payload).await,
        Err(e) => Err(e),
    };
    scrub(&mut payload);

    let ts = outcome?;
    info!(
        workspace_id = %request.workspace_id,
        action = %action,
        channel = %request.routing.channel,
        "Send dispatched"
    );

    Ok(Json(SendResponse { ok: true, ts }))
}

async fn dispatch(
    state: &AppState,
    record: &crate::workspaces::WorkspaceRecord,
    action: SendAction,
    payload: &Value,
) -> RelayResult<Option<String>> {
    let token = state.registry.bot_token(record)?;
    let mut reply = state
        .slack
        .call(action.as_str(), &token, payload)
        .await
        .map_err(|e| {
            warn!(workspace_id = %record.workspace_id, action = %action, error = %e, "Slack call failed");
            RelayError::Platform(e.to_string())
        })?;

    // Replies echo the message text and blocks back.
    Ok(reply_ts(&mut reply))
}

/// Take the message `ts` out of a Slack reply, then wipe the reply.
fn reply_ts(reply: &mut Value) -> Option<String> {
    let ts = reply["ts"].as_str().map(String::from);
    scrub(reply);
    ts
}
