//! Shared fixtures for gateway, session, and handler tests.

use crate::chat::ai_bridge::AiBridge;
use crate::chat::generator::TextGenerator;
use crate::server::AppState;
use async_trait::async_trait;
use lib_auth::encode_jwt;
use lib_core::config::DEFAULT_AI_TRIGGER;
use lib_core::{create_test_pool, Config};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub(crate) const TEST_SECRET: &str = "test-secret-key-must-be-at-least-32-characters-long!";

pub(crate) fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        ai_trigger: DEFAULT_AI_TRIGGER.to_string(),
        require_membership: false,
        message_sweep_secs: 300,
    }
}

/// State over a fresh in-memory database with the co-author disabled.
pub(crate) async fn test_state() -> AppState {
    test_state_with(AiBridge::new(None, DEFAULT_AI_TRIGGER, false)).await
}

pub(crate) async fn test_state_with(bridge: AiBridge) -> AppState {
    let pool = create_test_pool().await.unwrap();
    AppState::new(pool, test_config(), Arc::new(bridge))
}

pub(crate) fn token_for(user_id: Uuid, email: &str) -> String {
    encode_jwt(user_id, email, TEST_SECRET, 1).unwrap()
}

/// Returns a canned answer and records every prompt.
pub(crate) struct StubGenerator {
    reply: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub(crate) fn answering(reply: Result<&str, &str>) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.map(str::to_string).map_err(str::to_string),
            prompts: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone()
    }
}
