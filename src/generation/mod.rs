//! Text generation service abstraction
//!
//! The summarization core only talks to [`GenerationClient`]; the HTTP
//! transport, prompts and locale tables live behind it.

pub mod i18n;
pub mod openai;
pub mod prompts;

pub use openai::OpenAiClient;
pub use prompts::PromptBuilder;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a chat-completion prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation errors
///
/// These are surfaced to the caller as-is; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Missing API key for the {0} provider")]
    MissingApiKey(&'static str),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Upstream error: HTTP {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request needs {tokens} tokens but the model accepts {max}")]
    TooMuchTokens { tokens: usize, max: usize },
}

/// Capability turning a structured prompt into generated text
///
/// `Ok(None)` means the service answered without any content.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a commit message for a prepared prompt
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Option<String>, GenerationError>;

    /// Compress several newline-joined commit messages into one
    async fn generate_summary(
        &self,
        joined: &str,
        prompts: &PromptBuilder,
    ) -> Result<Option<String>, GenerationError> {
        self.generate(&prompts.summary_messages(joined)).await
    }
}
