//! # Web Library
//!
//! Axum server for real-time project collaboration: the WebSocket gateway,
//! per-project rooms, the AI co-author bridge, and the authenticated HTTP
//! routes for project state.

pub mod chat;
pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{create_router, start_server, AppState, ServerConfig};
