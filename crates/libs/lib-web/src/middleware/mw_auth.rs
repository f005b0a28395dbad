//! # Authentication Middleware
//!
//! Validates `Authorization: Bearer <token>` through the state's
//! [`IdentityVerifier`](lib_auth::IdentityVerifier) and injects the resulting
//! [`Identity`] into request extensions.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/api/projects/{project_id}", get(get_project))
//!     .route_layer(axum::middleware::from_fn_with_state(state.clone(), require_auth));
//! ```
//!
//! Handlers then extract `Extension<Identity>`.

use crate::server::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use lib_auth::Identity;
use lib_core::AppError;
use tracing::{debug, warn};

/// Token part of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Reject the request with 401 unless it carries a valid bearer token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        warn!("[AUTH] Missing or malformed Authorization header");
        AppError::Authentication("Authentication required".to_string())
    })?;

    let identity: Identity = state.verifier.verify(token).map_err(|e| {
        warn!("[AUTH] Token validation failed: {}", e);
        AppError::Authentication("Invalid or expired token".to_string())
    })?;

    debug!("[AUTH] Authenticated user: {} (id: {})", identity.email, identity.user_id);

    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}
