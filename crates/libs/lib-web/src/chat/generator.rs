//! # Text Generator
//!
//! The generative text service behind the AI co-author, reached through
//! rust-genai. Supports Gemini, OpenAI, Anthropic and DeepSeek; the provider is
//! picked from `AI_PROVIDER` or from whichever API key is present.

use async_trait::async_trait;
use genai::chat::{ChatMessage, ChatOptions, ChatRequest, ChatResponseFormat};
use genai::resolver::{AuthData, AuthResolver};
use genai::Client;
use lib_utils::{get_env_or, get_env_parse_or};
use tracing::{debug, warn};

/// Prompt-in, text-out generative service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a raw response for `prompt`. The returned text is not inspected.
    async fn generate(&self, prompt: &str) -> Result<String, String>;
}

/// AI provider type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AiProvider {
    #[default]
    Gemini,
    OpenAI,
    Anthropic,
    DeepSeek,
}

impl AiProvider {
    const ALL: [AiProvider; 4] = [
        AiProvider::Gemini,
        AiProvider::OpenAI,
        AiProvider::Anthropic,
        AiProvider::DeepSeek,
    ];

    /// Get the default model name for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "gemini-2.0-flash",
            AiProvider::OpenAI => "gpt-4o-mini",
            AiProvider::Anthropic => "claude-3-5-haiku-latest",
            AiProvider::DeepSeek => "deepseek-chat",
        }
    }

    /// Get the environment variable name for the API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            AiProvider::Gemini => "GEMINI_API_KEY",
            AiProvider::OpenAI => "OPENAI_API_KEY",
            AiProvider::Anthropic => "ANTHROPIC_API_KEY",
            AiProvider::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }

    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(AiProvider::Gemini),
            "openai" => Some(AiProvider::OpenAI),
            "anthropic" => Some(AiProvider::Anthropic),
            "deepseek" => Some(AiProvider::DeepSeek),
            _ => None,
        }
    }

    /// First provider whose API key is set, if any.
    fn detect() -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| std::env::var(p.api_key_env()).is_ok_and(|k| !k.trim().is_empty()))
    }
}

/// Built-in instructions that state the response contract.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert full-stack developer pairing with a team inside a shared project.
Answer every request with a single JSON object and nothing else:
{
  "text": "short explanation for the chat",
  "fileTree": { "<name>": { "file": { "contents": "<source>" } } },
  "buildCommand": { "mainItem": "npm", "commands": ["install"] },
  "startCommand": { "mainItem": "node", "commands": ["app.js"] }
}
Only "text" is required. Include "fileTree" when you produce files; keep every file in
the project root and reference siblings with a ./ prefix. Include the commands only when
the files need them to build or run."#;

/// Generator configuration
#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    pub provider: AiProvider,
    /// API key for the provider; empty means the co-author is disabled
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl GeneratorConfig {
    /// Read generator settings from the environment.
    ///
    /// Unparsable numbers fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        let provider = std::env::var("AI_PROVIDER")
            .ok()
            .and_then(|name| {
                let parsed = AiProvider::parse(&name);
                if parsed.is_none() {
                    warn!("[AI] Unknown AI_PROVIDER '{}', detecting from API keys", name);
                }
                parsed
            })
            .or_else(AiProvider::detect)
            .unwrap_or_default();

        let temperature = get_env_parse_or("AI_TEMPERATURE", 0.7).unwrap_or_else(|e| {
            warn!("[AI] {}, using 0.7", e);
            0.7
        });
        let max_tokens = get_env_parse_or("AI_MAX_TOKENS", 4096).unwrap_or_else(|e| {
            warn!("[AI] {}, using 4096", e);
            4096
        });

        Self {
            provider,
            api_key: get_env_or(provider.api_key_env(), "").trim().to_string(),
            model: get_env_or("AI_MODEL", provider.default_model()),
            system_prompt: get_env_or("AI_SYSTEM_PROMPT", DEFAULT_SYSTEM_PROMPT),
            temperature,
            max_tokens,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// [`TextGenerator`] backed by a rust-genai client in JSON response mode.
pub struct GenaiGenerator {
    client: Client,
    config: GeneratorConfig,
}

impl GenaiGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let api_key = config.api_key.clone();
        let auth_resolver = AuthResolver::from_resolver_fn(
            move |_model_iden| -> Result<Option<AuthData>, genai::resolver::Error> {
                Ok(Some(AuthData::from_single(api_key.clone())))
            },
        );

        let client = Client::builder().with_auth_resolver(auth_resolver).build();

        Self { client, config }
    }
}

#[async_trait]
impl TextGenerator for GenaiGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, String> {
        let chat_req = ChatRequest::default()
            .with_system(&self.config.system_prompt)
            .append_message(ChatMessage::user(prompt));

        let chat_options = ChatOptions::default()
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_response_format(ChatResponseFormat::JsonMode);

        debug!(model = %self.config.model, prompt_len = prompt.len(), "[AI] Calling generative service");
        let chat_res = self
            .client
            .exec_chat(&self.config.model, chat_req, Some(&chat_options))
            .await
            .map_err(|e| format!("AI API error: {}", e))?;

        chat_res
            .first_text()
            .map(str::to_string)
            .ok_or_else(|| "No response from AI".to_string())
    }
}
