//! Configuration snapshot for one summarization run
//!
//! Loaded once from an optional TOML file, then overridden by the `OCO_*`
//! environment variables. The resulting value is immutable for the whole run.

use crate::chunking::token_budget::TokenBudgetConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("An API key is required for the {0} provider (set OCO_OPENAI_API_KEY)")]
    MissingApiKey(&'static str),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub tokens: TokenBudgetConfig,

    #[serde(default)]
    pub commit: CommitConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation service provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Azure,
    Ollama,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Azure => "azure",
            Provider::Ollama => "ollama",
        }
    }

    /// Local providers do not need an API key
    pub fn is_local(&self) -> bool {
        matches!(self, Provider::Ollama)
    }
}

/// Generation service connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_provider")]
    pub provider: Provider,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Overrides the provider's default endpoint
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_azure_api_version")]
    pub azure_api_version: String,

    #[serde(default)]
    pub azure_deployment: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_provider() -> Provider {
    Provider::OpenAi
}

fn default_model() -> String {
    "gpt-3.5-turbo-16k".to_string()
}

fn default_azure_api_version() -> String {
    "2023-07-01-preview".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            api_key: None,
            base_url: None,
            model: default_model(),
            azure_api_version: default_azure_api_version(),
            azure_deployment: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Which instruction set the main prompt uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PromptModule {
    #[serde(rename = "conventional-commit")]
    ConventionalCommit,
    #[serde(rename = "@commitlint")]
    Commitlint,
}

impl PromptModule {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "conventional-commit" => Some(PromptModule::ConventionalCommit),
            "@commitlint" => Some(PromptModule::Commitlint),
            _ => None,
        }
    }
}

/// Formatting rules for the generated commit message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitConfig {
    /// Preface the title with a GitMoji
    #[serde(default)]
    pub emoji: bool,

    /// Add a short description after the title
    #[serde(default)]
    pub description: bool,

    /// Include the issue ID in the title
    #[serde(default)]
    pub issue_enabled: bool,

    #[serde(default)]
    pub issue_prefix: String,

    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_prompt_module")]
    pub prompt_module: PromptModule,

    /// Rules quoted in the prompt when the commitlint module is selected
    #[serde(default)]
    pub commitlint_rules: Vec<String>,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_prompt_module() -> PromptModule {
    PromptModule::ConventionalCommit
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            emoji: false,
            description: false,
            issue_enabled: false,
            issue_prefix: String::new(),
            language: default_language(),
            prompt_module: default_prompt_module(),
            commitlint_rules: vec![],
        }
    }
}

/// Chunked generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Delay between collecting successive partial messages
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
}

fn default_pacing_delay_ms() -> u64 {
    2000
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            pacing_delay_ms: default_pacing_delay_ms(),
        }
    }
}

impl ChunkingConfig {
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val.to_lowercase() == "true" || val == "1"
}

impl Config {
    /// Load from a TOML file; a missing file yields the defaults
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Load file, apply environment overrides and validate
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?.from_env().normalize();
        config.validate()?;
        Ok(config)
    }

    /// Override with environment variables if present
    pub fn from_env(mut self) -> Self {
        if let Ok(val) = std::env::var("OCO_OPENAI_API_KEY") {
            if !val.is_empty() {
                self.generation.api_key = Some(SecretString::new(val));
            }
        }

        if let Ok(val) = std::env::var("OCO_OPENAI_BASE_PATH") {
            self.generation.base_url = Some(val);
        }

        if let Ok(val) = std::env::var("OCO_OPENAI_API_TYPE") {
            if val == "azure" {
                self.generation.provider = Provider::Azure;
            }
        }

        if let Ok(val) = std::env::var("OCO_AI_PROVIDER") {
            if val == "ollama" {
                self.generation.provider = Provider::Ollama;
            }
        }

        if let Ok(val) = std::env::var("OCO_MODEL") {
            self.generation.model = val;
        }

        if let Ok(val) = std::env::var("OCO_AZURE_API_VERSION") {
            self.generation.azure_api_version = val;
        }

        if let Ok(val) = std::env::var("OCO_AZURE_DEPLOYMENT") {
            self.generation.azure_deployment = Some(val);
        }

        if let Ok(val) = std::env::var("OCO_TOKENS_MAX_INPUT") {
            if let Ok(num) = val.parse() {
                self.tokens.max_input = num;
            }
        }

        if let Ok(val) = std::env::var("OCO_TOKENS_MAX_OUTPUT") {
            if let Ok(num) = val.parse() {
                self.tokens.max_output = num;
            }
        }

        if let Ok(val) = std::env::var("OCO_DESCRIPTION") {
            self.commit.description = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("OCO_EMOJI") {
            self.commit.emoji = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("OCO_ISSUE_ENABLED") {
            self.commit.issue_enabled = parse_flag(&val);
        }

        if let Ok(val) = std::env::var("OCO_ISSUE_PREFIX") {
            self.commit.issue_prefix = val;
        }

        if let Ok(val) = std::env::var("OCO_LANGUAGE") {
            self.commit.language = val;
        }

        if let Ok(val) = std::env::var("OCO_PROMPT_MODULE") {
            if let Some(module) = PromptModule::parse(&val) {
                self.commit.prompt_module = module;
            }
        }

        if let Ok(val) = std::env::var("OCO_PACING_DELAY_MS") {
            if let Ok(ms) = val.parse() {
                self.chunking.pacing_delay_ms = ms;
            }
        }

        self
    }

    /// Derived settings: a configured issue prefix turns the issue ID on
    pub fn normalize(mut self) -> Self {
        if !self.commit.issue_prefix.is_empty() {
            self.commit.issue_enabled = true;
        }
        self
    }

    /// Validate token limits and credentials
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tokens.max_input == 0 {
            return Err(ConfigError::Invalid(
                "max input tokens must be greater than zero".to_string(),
            ));
        }

        if self.tokens.max_output == 0 {
            return Err(ConfigError::Invalid(
                "max output tokens must be greater than zero".to_string(),
            ));
        }

        if self.tokens.max_output >= self.tokens.max_input {
            return Err(ConfigError::Invalid(format!(
                "max output tokens ({}) must be lower than max input tokens ({})",
                self.tokens.max_output, self.tokens.max_input
            )));
        }

        if self.generation.api_key.is_none() && !self.generation.provider.is_local() {
            return Err(ConfigError::MissingApiKey(self.generation.provider.as_str()));
        }

        if self.generation.provider == Provider::Azure && self.generation.base_url.is_none() {
            return Err(ConfigError::Invalid(
                "the azure provider needs a base URL (OCO_OPENAI_BASE_PATH)".to_string(),
            ));
        }

        Ok(())
    }
}
