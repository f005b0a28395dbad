//! # Core Library
//!
//! Core models, database, configuration, and DTOs for the collaboration server.

pub mod config;
pub mod error;
pub mod model;
pub mod dto;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, Result};
pub use model::store::{DbPool, create_pool, create_test_pool, run_migrations};
