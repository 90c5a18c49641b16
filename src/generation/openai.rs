//! OpenAI-compatible chat completion client (OpenAI, Azure OpenAI, Ollama)

use super::prompts::PromptBuilder;
use super::{ChatMessage, GenerationClient, GenerationError};
use crate::chunking::token_budget::{TokenBudgetConfig, TokenBudgetManager};
use crate::chunking::token_estimator::TokenEstimator;
use crate::config::{GenerationConfig, Provider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Chat completion client for OpenAI-compatible APIs
pub struct OpenAiClient {
    http: Client,
    config: GenerationConfig,
    budget: TokenBudgetManager,
    estimator: Arc<dyn TokenEstimator>,
}

impl OpenAiClient {
    /// Create a new client
    pub fn new(
        config: GenerationConfig,
        tokens: TokenBudgetConfig,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Result<Self, GenerationError> {
        if config.api_key.is_none() && !config.provider.is_local() {
            return Err(GenerationError::MissingApiKey(config.provider.as_str()));
        }
        if config.provider == Provider::Azure && config.base_url.is_none() {
            return Err(GenerationError::Initialization(
                "azure provider requires a base URL".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| GenerationError::Initialization(e.to_string()))?;

        Ok(Self {
            http,
            config,
            budget: TokenBudgetManager::new(tokens),
            estimator,
        })
    }

    /// Chat completion endpoint for the configured provider
    fn endpoint(&self) -> String {
        match self.config.provider {
            Provider::Azure => {
                let base = self.config.base_url.as_deref().unwrap_or_default();
                let deployment = self
                    .config
                    .azure_deployment
                    .as_deref()
                    .unwrap_or(&self.config.model);
                format!(
                    "{}/openai/deployments/{}/chat/completions",
                    base.trim_end_matches('/'),
                    deployment
                )
            }
            Provider::OpenAi | Provider::Ollama => {
                let default = if self.config.provider == Provider::Ollama {
                    OLLAMA_BASE_URL
                } else {
                    OPENAI_BASE_URL
                };
                let base = self.config.base_url.as_deref().unwrap_or(default);
                format!("{}/chat/completions", base.trim_end_matches('/'))
            }
        }
    }

    /// Reject prompts the model cannot accept before sending them
    fn preflight(&self, messages: &[ChatMessage]) -> Result<(), GenerationError> {
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        let tokens = self.budget.prompt_overhead(self.estimator.as_ref(), &contents);
        let max = self.budget.max_request_tokens();
        if tokens > max {
            return Err(GenerationError::TooMuchTokens { tokens, max });
        }
        Ok(())
    }

    /// Send one chat completion request
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<String>, GenerationError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            temperature: 0.0,
            top_p: 0.1,
            max_tokens: self.budget.config().max_output,
        };

        debug!(
            "Requesting chat completion: {} messages, model {}",
            messages.len(),
            self.config.model
        );

        let mut req = self.http.post(self.endpoint()).json(&request);

        match self.config.provider {
            Provider::Azure => {
                req = req.query(&[("api-version", self.config.azure_api_version.as_str())]);
                if let Some(api_key) = &self.config.api_key {
                    req = req.header("api-key", api_key.expose_secret().as_str());
                }
            }
            Provider::OpenAi | Provider::Ollama => {
                if let Some(api_key) = &self.config.api_key {
                    req = req.bearer_auth(api_key.expose_secret());
                }
            }
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(e.to_string())
            } else {
                GenerationError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Chat completion failed with status {}", status);

            if status == StatusCode::UNAUTHORIZED {
                let message = serde_json::from_str::<ErrorResponse>(&body)
                    .ok()
                    .and_then(|e| e.error)
                    .map(|e| e.message)
                    .unwrap_or(body);
                return Err(GenerationError::Unauthorized(message));
            }

            return Err(GenerationError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content))
    }
}

#[async_trait]
impl GenerationClient for OpenAiClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Option<String>, GenerationError> {
        self.preflight(messages)?;
        self.complete(messages).await
    }

    async fn generate_summary(
        &self,
        joined: &str,
        prompts: &PromptBuilder,
    ) -> Result<Option<String>, GenerationError> {
        self.complete(&prompts.summary_messages(joined)).await
    }
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    top_p: f32,
    max_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}
