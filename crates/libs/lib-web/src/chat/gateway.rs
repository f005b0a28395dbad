//! # Session Gateway
//!
//! Authenticates a WebSocket handshake and resolves it to a project room.
//!
//! The handshake is `GET /ws?projectId=<uuid>[&token=<jwt>]`. The `token` query
//! field takes precedence over an `Authorization: Bearer` header. Checks run in
//! this order:
//!
//! 1. `projectId` must be a well-formed id, otherwise `AuthenticationError`
//! 2. the project is looked up; a missing project does not refuse the handshake
//! 3. a credential must be present and accepted by the [`IdentityVerifier`]
//! 4. with `COLLAB_REQUIRE_MEMBERSHIP=true`, a verified user must belong to an
//!    existing project, otherwise `Forbidden`
//!
//! [`IdentityVerifier`]: lib_auth::IdentityVerifier

use crate::chat::session::{Session, SessionPhase};
use crate::middleware::mw_auth::bearer_token;
use crate::server::AppState;
use axum::http::HeaderMap;
use lib_core::model::store::ProjectRepository;
use lib_core::{AppError, Result};
use lib_utils::validate_identifier;
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Query string of the WebSocket handshake.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    #[serde(rename = "projectId")]
    pub project_id: Option<String>,
    pub token: Option<String>,
}

/// Handshake parameters after credential source resolution.
#[derive(Debug, Default)]
pub struct Handshake {
    pub project_id: Option<String>,
    pub credential: Option<String>,
}

impl Handshake {
    pub fn from_request(query: HandshakeQuery, headers: &HeaderMap) -> Self {
        let credential = query
            .token
            .filter(|t| !t.trim().is_empty())
            .or_else(|| bearer_token(headers).map(str::to_string));

        Self {
            project_id: query.project_id,
            credential,
        }
    }
}

/// Run the handshake checks and build a session in the `Connecting` phase.
pub async fn admit(state: &AppState, handshake: Handshake) -> Result<Session> {
    let project_id = handshake
        .project_id
        .as_deref()
        .ok_or_else(|| reject("Invalid projectId"))
        .and_then(|raw| validate_identifier(raw, "projectId").map_err(reject))?;

    let project = match ProjectRepository::find_by_id(&state.db, project_id).await {
        Ok(project) => project,
        Err(e) => {
            warn!(project_id = %project_id, error = %e, "[WS] Project lookup failed, admitting without project");
            None
        }
    };
    if project.is_none() {
        debug!(project_id = %project_id, "[WS] Handshake for unknown project");
    }

    let credential = handshake
        .credential
        .ok_or_else(|| reject("Authentication error"))?;
    let identity = state.verifier.verify(&credential).map_err(|e| {
        debug!(error = %e, "[AUTH] Credential rejected");
        reject("Authentication error")
    })?;

    if state.config.require_membership && project.is_some() {
        let member = ProjectRepository::is_member(&state.db, project_id, identity.user_id).await?;
        if !member {
            warn!(
                phase = ?SessionPhase::Rejected,
                project_id = %project_id,
                user_id = %identity.user_id,
                "[WS] Non-member refused"
            );
            return Err(AppError::Forbidden("Not a member of this project".to_string()));
        }
    }

    info!(
        project_id = %project_id,
        user_id = %identity.user_id,
        project_found = project.is_some(),
        "[WS] Handshake accepted for {}",
        identity.email
    );

    Ok(Session::new(identity, project_id, project))
}

fn reject(reason: impl Into<String>) -> AppError {
    let reason = reason.into();
    warn!(phase = ?SessionPhase::Rejected, "[WS] Handshake rejected: {}", reason);
    AppError::Authentication(reason)
}
