//! # Application Configuration
//!
//! This module manages application configuration loaded from environment variables.
//! All configuration is validated on startup to fail fast if misconfigured.
//!
//! The AI bridge reads its own provider settings (see `lib_web::chat::ai_bridge`);
//! everything the gateway, stores, and HTTP layer need lives here.

use lib_utils::{get_env, get_env_or, get_env_parse_or};

/// Default chat marker that routes a message to the AI co-author.
pub const DEFAULT_AI_TRIGGER: &str = "@AI";

/// Application configuration loaded from environment variables.
#[derive(Clone, Debug)]
pub struct Config {
    /// SQLite database connection URL
    pub database_url: String,

    /// Secret key for JWT token verification
    ///
    /// **Must be at least 32 characters long** for security.
    pub jwt_secret: String,

    /// Substring in chat text that invokes the AI bridge
    pub ai_trigger: String,

    /// Reject verified users who are not members of the project they connect to
    pub require_membership: bool,

    /// Interval between expired-message sweeps, in seconds
    pub message_sweep_secs: u64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, String> {
        let database_url = get_env_or("DATABASE_URL", "sqlite:data/collab.db");

        let jwt_secret = get_env("JWT_SECRET").map_err(|e| e.to_string())?;

        let ai_trigger = get_env_or("AI_TRIGGER", DEFAULT_AI_TRIGGER);

        let require_membership = get_env_parse_or("COLLAB_REQUIRE_MEMBERSHIP", false)
            .map_err(|e| format!("COLLAB_REQUIRE_MEMBERSHIP must be true or false: {}", e))?;

        let message_sweep_secs = get_env_parse_or("MESSAGE_SWEEP_SECS", 300)
            .map_err(|e| format!("MESSAGE_SWEEP_SECS must be a valid number: {}", e))?;

        Ok(Self {
            database_url,
            jwt_secret,
            ai_trigger,
            require_membership,
            message_sweep_secs,
        })
    }

    /// Validate configuration values against security and business rules.
    pub fn validate(&self) -> Result<(), String> {
        if self.jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".to_string());
        }

        if self.ai_trigger.trim().is_empty() {
            return Err("AI_TRIGGER cannot be empty".to_string());
        }

        if self.message_sweep_secs == 0 {
            return Err("MESSAGE_SWEEP_SECS must be greater than zero".to_string());
        }

        Ok(())
    }
}
