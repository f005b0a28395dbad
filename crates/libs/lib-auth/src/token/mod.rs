//! # JWT Token Management
//!
//! JWT token generation and validation.
//!
//! Credential issuance lives outside this workspace; `encode_jwt` is kept for
//! tooling and tests that need to mint tokens the verifier will accept.

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lib_utils::now_utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// JWT Claims structure containing user authentication information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Email address of the user
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at time (Unix timestamp)
    pub iat: i64,
}

/// Token failure reasons.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Encode a JWT token with user claims.
///
/// A negative `expiration_hours` produces an already-expired token.
pub fn encode_jwt(
    user_id: Uuid,
    email: &str,
    secret: &str,
    expiration_hours: i64,
) -> Result<String, TokenError> {
    let now = now_utc();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| TokenError::Encode(e.to_string()))
}

/// Decode and validate a JWT token (signature and expiry).
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims, TokenError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid(e.to_string()),
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-must-be-at-least-32-chars-long!";

    #[test]
    fn test_jwt_encoding_decoding() {
        let user_id = Uuid::new_v4();

        let token = encode_jwt(user_id, "ada@example.com", SECRET, 24)
            .expect("JWT encoding should succeed");
        let claims = decode_jwt(&token, SECRET)
            .expect("JWT decoding should succeed");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "ada@example.com");
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = encode_jwt(Uuid::new_v4(), "ada@example.com", SECRET, -2).unwrap();
        assert_eq!(decode_jwt(&token, SECRET).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = encode_jwt(Uuid::new_v4(), "ada@example.com", SECRET, 1).unwrap();
        let err = decode_jwt(&token, "another-secret-that-is-also-32-chars-long").unwrap_err();
        assert!(matches!(err, TokenError::Invalid(_)));
    }
}
