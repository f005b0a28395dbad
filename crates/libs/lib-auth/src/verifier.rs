//! # Identity Verifier
//!
//! The gateway never looks at tokens directly; it asks an [`IdentityVerifier`]
//! to turn an opaque bearer credential into an [`Identity`].

use crate::token::{decode_jwt, TokenError};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

/// A verified user identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: Uuid,
    pub email: String,
}

/// Validates bearer credentials.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Identity, TokenError>;
}

/// HMAC-signed JWT verifier.
#[derive(Clone)]
pub struct JwtVerifier {
    secret: String,
}

impl JwtVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<Identity, TokenError> {
        let claims = decode_jwt(credential, &self.secret)?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| TokenError::Invalid("subject is not a user id".to_string()))?;

        debug!("[AUTH] Verified credential for {} (id: {})", claims.email, user_id);

        Ok(Identity {
            user_id,
            email: claims.email,
        })
    }
}
