//! # HTTP Request Handlers
//!
//! - **[`websocket`]**: `GET /ws` handshake and socket pump
//! - **[`projects`]**: authenticated project state routes
//!
//! Handlers return `lib_core::Result<T>`; [`AppError`](lib_core::AppError)
//! renders itself as `{"error": ..., "code": ...}` with the matching status.

pub mod projects;
pub mod websocket;
