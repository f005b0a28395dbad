//! # Middleware
//!
//! - **[`mw_auth`]**: bearer-token authentication through the identity verifier
//! - **[`mw_req_stamp`]**: request id stamping
//! - **[`mw_logging`]**: request/response logging with header redaction

// region: --- Modules
pub mod mw_auth;
pub mod mw_logging;
pub mod mw_req_stamp;
// endregion: --- Modules

// region: --- Re-exports
pub use mw_auth::{bearer_token, require_auth};
pub use mw_logging::log_requests;
pub use mw_req_stamp::{request_id, stamp_req, RequestStamp};
// endregion: --- Re-exports
