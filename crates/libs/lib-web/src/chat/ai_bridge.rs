//! # AI Co-Author Bridge
//!
//! Routes chat messages that mention the trigger marker to a [`TextGenerator`]
//! and broadcasts the answer to the whole room as a message from the synthetic
//! `ai` sender.
//!
//! The answer travels as raw text. [`AiEnvelope`] describes the shape the model
//! is asked to produce; by default it is only used to classify the answer in the
//! logs. With `AI_STRICT_SCHEMA=true` an answer that does not decode is reported
//! to the requester instead of being broadcast.
//!
//! Failures never reach the room: they become a private `error` event for the
//! connection that asked.

use crate::chat::generator::{GenaiGenerator, GeneratorConfig, TextGenerator};
use crate::chat::rooms::{ConnectionId, RoomManager};
use futures_util::FutureExt;
use lib_core::dto::{decode_unbounded, FileTree, MessagePayload, SenderInfo, ServerEvent};
use lib_utils::get_env_parse_or;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Response contract the generator is instructed to follow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEnvelope {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file_tree: Option<FileTree>,
    #[serde(default)]
    pub build_command: Option<CommandSpec>,
    #[serde(default)]
    pub start_command: Option<CommandSpec>,
}

/// A program plus its arguments, e.g. `npm install`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSpec {
    pub main_item: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl AiEnvelope {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        decode_unbounded(raw.as_bytes())
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("AI co-author is not configured")]
    Disabled,

    /// The upstream call failed. The detail stays in the logs.
    #[error("Failed to process AI request.")]
    Generation(String),

    #[error("AI response was not in the expected format")]
    Schema(String),
}

/// Trigger detection and generator invocation.
pub struct AiBridge {
    generator: Option<Arc<dyn TextGenerator>>,
    trigger: String,
    strict_schema: bool,
}

impl AiBridge {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, trigger: impl Into<String>, strict_schema: bool) -> Self {
        Self {
            generator,
            trigger: trigger.into(),
            strict_schema,
        }
    }

    /// Build the bridge from `AI_*` environment settings.
    ///
    /// Without an API key the bridge stays up but every request fails with
    /// [`BridgeError::Disabled`].
    pub fn from_env(trigger: &str) -> Self {
        let config = GeneratorConfig::from_env();
        let strict_schema = get_env_parse_or("AI_STRICT_SCHEMA", false).unwrap_or_else(|e| {
            warn!("[AI] {}, strict schema off", e);
            false
        });

        let generator: Option<Arc<dyn TextGenerator>> = if config.is_enabled() {
            info!(
                provider = ?config.provider,
                model = %config.model,
                strict_schema,
                "[AI] Co-author enabled (trigger '{}')",
                trigger
            );
            Some(Arc::new(GenaiGenerator::new(config)))
        } else {
            warn!(
                "[AI] {} not set, co-author disabled",
                config.provider.api_key_env()
            );
            None
        };

        Self::new(generator, trigger, strict_schema)
    }

    pub fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Prompt carried by `text`, if it mentions the trigger marker.
    ///
    /// The first occurrence of the marker is removed and the rest trimmed.
    pub fn extract_prompt(&self, text: &str) -> Option<String> {
        if !text.contains(&self.trigger) {
            return None;
        }
        Some(text.replacen(&self.trigger, "", 1).trim().to_string())
    }

    /// Ask the generator and wrap its answer as a synthetic chat message.
    pub async fn respond(&self, prompt: &str) -> Result<MessagePayload, BridgeError> {
        let generator = self.generator.as_ref().ok_or(BridgeError::Disabled)?;

        let raw = generator.generate(prompt).await.map_err(BridgeError::Generation)?;

        match AiEnvelope::parse(&raw) {
            Ok(envelope) => info!(
                has_text = envelope.text.is_some(),
                has_file_tree = envelope.file_tree.is_some(),
                response_len = raw.len(),
                "[AI] Structured response"
            ),
            Err(e) if self.strict_schema => return Err(BridgeError::Schema(e.to_string())),
            Err(e) => warn!(error = %e, response_len = raw.len(), "[AI] Opaque response, relaying verbatim"),
        }

        Ok(MessagePayload {
            message: raw,
            sender: SenderInfo::assistant(),
        })
    }

    /// Run [`respond`](Self::respond) on its own task and deliver the outcome.
    ///
    /// Success goes to every member of the room; failure only to `requester`.
    pub fn spawn_reply(
        self: &Arc<Self>,
        rooms: RoomManager,
        project_id: Uuid,
        requester: ConnectionId,
        prompt: String,
    ) -> JoinHandle<()> {
        let bridge = Arc::clone(self);
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(bridge.respond(&prompt)).catch_unwind().await;

            let failure = match outcome {
                Ok(Ok(payload)) => {
                    let delivered = rooms
                        .broadcast_all(project_id, &ServerEvent::ProjectMessage(payload.into()))
                        .await;
                    info!(project_id = %project_id, delivered, "[AI] Reply broadcast");
                    return;
                }
                Ok(Err(e)) => e,
                Err(_) => BridgeError::Generation("generator panicked".to_string()),
            };

            match &failure {
                BridgeError::Generation(detail) | BridgeError::Schema(detail) => error!(
                    project_id = %project_id,
                    connection_id = %requester,
                    detail = %detail,
                    "[AI] {}",
                    failure
                ),
                BridgeError::Disabled => warn!(connection_id = %requester, "[AI] {}", failure),
            }
            rooms
                .send_to(project_id, requester, ServerEvent::error(failure.to_string()))
                .await;
        })
    }
}
