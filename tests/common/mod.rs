//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use commit_summarizer::chunking::{CharRatioEstimator, TokenBudgetManager};
use commit_summarizer::generation::PromptBuilder;
use commit_summarizer::{
    ChatMessage, Config, GenerationClient, GenerationError, SummaryOrchestrator,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply = Box<dyn Fn(&str) -> Result<Option<String>, GenerationError> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> Duration + Send + Sync>;

/// In-process generation client answering from a script
pub struct ScriptedClient {
    reply: Reply,
    delay: Delay,
    summary: Option<String>,
    /// Last user message of every `generate` call, in arrival order
    pub prompts: Mutex<Vec<String>>,
    /// Joined partials received by every reduce call
    pub reductions: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(Some(text.clone())))
    }

    pub fn new<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Result<Option<String>, GenerationError> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            delay: Box::new(|_| Duration::ZERO),
            summary: Some("feat: summarised change".to_string()),
            prompts: Mutex::new(Vec::new()),
            reductions: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&str) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    pub fn with_summary(mut self, summary: Option<&str>) -> Self {
        self.summary = summary.map(str::to_string);
        self
    }

    pub fn generate_calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn reduce_calls(&self) -> usize {
        self.reductions.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationClient for ScriptedClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<Option<String>, GenerationError> {
        let content = messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().unwrap().push(content.clone());

        let delay = (self.delay)(&content);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        (self.reply)(&content)
    }

    async fn generate_summary(
        &self,
        joined: &str,
        _prompts: &PromptBuilder,
    ) -> Result<Option<String>, GenerationError> {
        self.reductions.lock().unwrap().push(joined.to_string());
        Ok(self.summary.clone())
    }
}

/// Config whose request budget is exactly `budget` with one char per token
pub fn config_with_budget(budget: usize) -> Config {
    let mut config = Config::default();
    config.chunking.pacing_delay_ms = 0;

    let prompts = PromptBuilder::new(&config.commit, "");
    let manager = TokenBudgetManager::new(config.tokens.clone());
    let overhead = prompts.overhead(&manager, &CharRatioEstimator::new(1));

    config.tokens.max_input =
        budget + config.tokens.adjustment_factor + overhead + config.tokens.max_output;
    config
}

pub fn orchestrator(client: Arc<ScriptedClient>, config: Config) -> SummaryOrchestrator {
    SummaryOrchestrator::new(client, Arc::new(CharRatioEstimator::new(1)), Arc::new(config))
        .with_pacing_delay(Duration::ZERO)
}

/// One file section of exactly `size` characters
pub fn sized_file(name: &str, size: usize) -> String {
    let mut diff = format!("diff --git a/{name} b/{name}\n@@ -1,1 +1,40 @@\n");
    assert!(diff.len() + 2 <= size, "size too small for the header");

    while size - diff.len() > 61 {
        diff.push('+');
        diff.push_str(&"x".repeat(58));
        diff.push('\n');
    }
    let remaining = size - diff.len();
    diff.push('+');
    diff.push_str(&"y".repeat(remaining - 2));
    diff.push('\n');

    assert_eq!(diff.len(), size);
    diff
}
