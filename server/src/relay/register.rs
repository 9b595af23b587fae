//! Registration Handlers
//!
//! `POST /api/register` links a server to a pending workspace using the
//! one-time registration code. `DELETE /api/register` unlinks it with a
//! request signed by the server's registered key.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use relay_common::{
    OkResponse, RegisterRequest, RegisterResponse, UnregisterRequest, UNREGISTER_ACTION,
};
use relay_crypto::{canonical, constant_time_eq, encoding, signing};
use tracing::{info, warn};

use super::error::{RelayError, RelayResult};
use super::replay::{is_fresh, now_secs};
use super::ssrf::validate_callback_url;
use super::{parse_body, require_fields, require_workspace_id};
use crate::api::AppState;
use crate::workspaces::{hash_auth_code, WorkspaceStatus};

fn require_public_key(name: &str, value: &str) -> RelayResult<()> {
    encoding::from_base64_array::<32>(value)
        .map(|_| ())
        .map_err(|_| RelayError::Validation(format!("{name} must be a base64 32-byte key")))
}

/// Activate a workspace.
///
/// POST /api/register
#[tracing::instrument(skip(state, body))]
pub async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> RelayResult<Json<RegisterResponse>> {
    let request: RegisterRequest = parse_body(&body)?;
    require_fields(&[
        ("workspace_id", request.workspace_id.as_str()),
        ("server_pubkey", request.server_pubkey.as_str()),
        ("server_signing_pubkey", request.server_signing_pubkey.as_str()),
        ("server_callback_url", request.server_callback_url.as_str()),
        ("auth_code", request.auth_code.as_str()),
    ])?;
    require_workspace_id(&request.workspace_id)?;
    require_public_key("server_pubkey", request.server_pubkey.as_str())?;
    require_public_key("server_signing_pubkey", request.server_signing_pubkey.as_str())?;
    // Stored in normalized form so forwarding sees the scheme the check saw.
    let callback_url = validate_callback_url(&request.server_callback_url)
        .map_err(|e| RelayError::Validation(format!("server_callback_url: {e}")))?;

    let record = state
        .registry
        .get(&request.workspace_id)
        .await?
        .ok_or(RelayError::WorkspaceNotFound)?;

    if record.status == WorkspaceStatus::Active {
        return Err(RelayError::AlreadyActive);
    }
    if record.auth_code_hash.is_empty() {
        warn!(workspace_id = %record.workspace_id, "Registration attempted with consumed code");
        return Err(RelayError::AuthCodeConsumed);
    }

    let presented = hash_auth_code(&request.auth_code, state.keys.auth_code_key());
    if !constant_time_eq(presented.as_bytes(), record.auth_code_hash.as_bytes()) {
        warn!(workspace_id = %record.workspace_id, "Registration code mismatch");
        return Err(RelayError::InvalidAuthCode);
    }

    state
        .registry
        .activate(
            &request.workspace_id,
            callback_url.as_str(),
            &request.server_pubkey,
            &request.server_signing_pubkey,
        )
        .await?;

    info!(workspace_id = %request.workspace_id, "Server registered");

    Ok(Json(RegisterResponse {
        ok: true,
        broker_pubkey: state.keys.box_public_b64(),
        broker_signing_pubkey: state.keys.signing_public_b64(),
    }))
}

/// Deactivate a workspace.
///
/// DELETE /api/register
#[tracing::instrument(skip(state, body))]
pub async fn unregister(
    State(state): State<AppState>,
    body: Bytes,
) -> RelayResult<Json<OkResponse>> {
    let request: UnregisterRequest = parse_body(&body)?;
    require_fields(&[
        ("workspace_id", request.workspace_id.as_str()),
        ("signature", request.signature.as_str()),
    ])?;
    require_workspace_id(&request.workspace_id)?;

    if !is_fresh(request.timestamp, now_secs()) {
        return Err(RelayError::StaleTimestamp);
    }

    let record = state
        .registry
        .get(&request.workspace_id)
        .await?
        .ok_or(RelayError::WorkspaceNotFound)?;
    if !record.is_active() || record.server_signing_pubkey.is_empty() {
        return Err(RelayError::WorkspaceInactive);
    }

    let payload = canonical::request_payload(
        &request.workspace_id,
        UNREGISTER_ACTION,
        request.timestamp,
        "",
    );
    if !signing::verify(&payload, &request.signature, &record.server_signing_pubkey) {
        warn!(workspace_id = %request.workspace_id, "Unregister signature rejected");
        return Err(RelayError::InvalidSignature);
    }

    state.registry.deactivate(&request.workspace_id).await?;
    info!(workspace_id = %request.workspace_id, "Server unregistered");

    Ok(Json(OkResponse { ok: true }))
}
