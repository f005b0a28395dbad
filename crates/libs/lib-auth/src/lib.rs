//! # Authentication Library
//!
//! JWT token management and the identity verifier used by the session gateway.

pub mod token;
pub mod verifier;

// Re-export commonly used types
pub use token::{Claims, TokenError, encode_jwt, decode_jwt};
pub use verifier::{Identity, IdentityVerifier, JwtVerifier};
