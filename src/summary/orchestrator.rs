//! Summary orchestrator
//!
//! Two paths:
//! - Direct: the diff fits one request, a single generation call answers.
//! - Chunked: the diff is decomposed, every chunk is dispatched at once,
//!   partial messages are collected in chunk order with a pacing delay, and
//!   one reduce call merges them into the final message.

use crate::chunking::models::{ChunkPrompt, DecomposeContext};
use crate::chunking::token_budget::TokenBudgetManager;
use crate::chunking::token_estimator::{TiktokenEstimator, TokenEstimator};
use crate::chunking::DiffDecomposer;
use crate::config::Config;
use crate::error::{GenerationStage, Result, SummaryError};
use crate::generation::{GenerationClient, GenerationError, OpenAiClient, PromptBuilder};
use crate::metrics::METRICS;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Generation path chosen for a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryMode {
    Direct,
    Chunked,
}

impl SummaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummaryMode::Direct => "direct",
            SummaryMode::Chunked => "chunked",
        }
    }
}

/// Decision taken for a diff before any generation call
#[derive(Debug, Clone)]
pub struct SummaryPlan {
    pub mode: SummaryMode,
    /// Tokens available for the variable part of one request
    pub budget: usize,
    pub diff_tokens: usize,
    /// Empty on the direct path
    pub chunks: Vec<ChunkPrompt>,
}

/// Turns a staged diff into one commit message
pub struct SummaryOrchestrator {
    client: Arc<dyn GenerationClient>,
    estimator: Arc<dyn TokenEstimator>,
    decomposer: DiffDecomposer,
    budget: TokenBudgetManager,
    config: Arc<Config>,
    pacing_delay: Duration,
}

impl SummaryOrchestrator {
    /// Create an orchestrator over an explicit configuration snapshot
    pub fn new(
        client: Arc<dyn GenerationClient>,
        estimator: Arc<dyn TokenEstimator>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            client,
            decomposer: DiffDecomposer::new(estimator.clone()),
            estimator,
            budget: TokenBudgetManager::new(config.tokens.clone()),
            pacing_delay: config.chunking.pacing_delay(),
            config,
        }
    }

    /// Create with the tiktoken estimator and the OpenAI-compatible client
    pub fn with_openai(config: Arc<Config>) -> Result<Self> {
        config.validate()?;
        let estimator: Arc<dyn TokenEstimator> = Arc::new(TiktokenEstimator::new()?);
        let client = OpenAiClient::new(
            config.generation.clone(),
            config.tokens.clone(),
            estimator.clone(),
        )?;
        Ok(Self::new(Arc::new(client), estimator, config))
    }

    /// Override the delay between collecting partial messages
    pub fn with_pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    fn prompts(&self, issue_id: &str) -> PromptBuilder {
        PromptBuilder::new(&self.config.commit, issue_id)
    }

    /// Budget left for the diff once the fixed prompt is accounted for
    fn request_budget(&self, prompts: &PromptBuilder) -> Result<usize> {
        let overhead = prompts.overhead(&self.budget, self.estimator.as_ref());
        self.budget.request_budget(overhead).map_err(|e| {
            METRICS.record_budget_failure();
            error!("Unusable request budget: {}", e);
            SummaryError::from(e)
        })
    }

    /// Decide between the direct and chunked paths without calling the service
    pub fn plan(&self, diff: &str, issue_id: &str) -> Result<SummaryPlan> {
        let prompts = self.prompts(issue_id);
        self.plan_with(&prompts, diff)
    }

    fn plan_with(&self, prompts: &PromptBuilder, diff: &str) -> Result<SummaryPlan> {
        if diff.trim().is_empty() {
            return Err(SummaryError::EmptyDiff);
        }

        let budget = self.request_budget(prompts)?;
        let diff_tokens = self.estimator.estimate(diff);

        if diff_tokens <= budget {
            info!("Diff needs {} tokens (budget: {}), generating directly", diff_tokens, budget);
            return Ok(SummaryPlan {
                mode: SummaryMode::Direct,
                budget,
                diff_tokens,
                chunks: Vec::new(),
            });
        }

        let context = DecomposeContext::new(prompts.issue_id(), prompts.locale());
        let chunks = self.decomposer.decompose(diff, budget, &context)?;
        info!(
            "Diff needs {} tokens (budget: {}), summarizing {} chunks",
            diff_tokens,
            budget,
            chunks.len()
        );

        Ok(SummaryPlan {
            mode: SummaryMode::Chunked,
            budget,
            diff_tokens,
            chunks,
        })
    }

    /// Generate the commit message for `diff`
    pub async fn summarize(&self, diff: &str, issue_id: &str) -> Result<String> {
        let prompts = self.prompts(issue_id);
        let plan = self.plan_with(&prompts, diff)?;
        METRICS.record_summary(plan.mode.as_str(), plan.chunks.len());

        match plan.mode {
            SummaryMode::Direct => self.run_direct(&prompts, diff).await,
            SummaryMode::Chunked => self.run_chunked(&prompts, plan.chunks).await,
        }
    }

    /// Single request, failing with `TooMuchTokens` instead of decomposing
    pub async fn generate_direct(&self, diff: &str, issue_id: &str) -> Result<String> {
        let prompts = self.prompts(issue_id);
        if diff.trim().is_empty() {
            return Err(SummaryError::EmptyDiff);
        }
        let budget = self.request_budget(&prompts)?;
        self.budget.check_budget(self.estimator.estimate(diff), budget)?;
        self.run_direct(&prompts, diff).await
    }

    async fn run_direct(&self, prompts: &PromptBuilder, diff: &str) -> Result<String> {
        let start = Instant::now();
        let result = self.client.generate(&prompts.diff_messages(diff)).await;
        METRICS.record_generation("direct", result.is_ok(), start.elapsed().as_secs_f64());

        require_text(result?, GenerationStage::Direct)
    }

    async fn run_chunked(
        &self,
        prompts: &PromptBuilder,
        chunks: Vec<ChunkPrompt>,
    ) -> Result<String> {
        let handles = self.dispatch(prompts, &chunks);
        let partials = self.collect(handles).await?;

        let joined = partials.join("\n");
        debug!("Reducing {} partial messages", partials.len());

        let start = Instant::now();
        let result = self.client.generate_summary(&joined, prompts).await;
        METRICS.record_generation("reduce", result.is_ok(), start.elapsed().as_secs_f64());

        require_text(result?, GenerationStage::Reduce)
    }

    /// Fan-out: one task per chunk, all in flight at once
    fn dispatch(
        &self,
        prompts: &PromptBuilder,
        chunks: &[ChunkPrompt],
    ) -> Vec<JoinHandle<std::result::Result<Option<String>, GenerationError>>> {
        chunks
            .iter()
            .map(|chunk| {
                let client = self.client.clone();
                let messages = prompts.diff_messages(&chunk.text());
                tokio::spawn(async move {
                    let start = Instant::now();
                    let result = client.generate(&messages).await;
                    let seconds = start.elapsed().as_secs_f64();
                    METRICS.record_generation("chunk", result.is_ok(), seconds);
                    result
                })
            })
            .collect()
    }

    /// Fan-in: drain results in chunk order, pausing between drains.
    ///
    /// The delay paces consumption of results, not dispatch of requests.
    async fn collect(
        &self,
        handles: Vec<JoinHandle<std::result::Result<Option<String>, GenerationError>>>,
    ) -> Result<Vec<String>> {
        let mut partials = Vec::with_capacity(handles.len());
        let mut pending = handles.into_iter().enumerate();

        while let Some((index, handle)) = pending.next() {
            if index > 0 && !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }

            let outcome = match handle.await {
                Ok(result) => result
                    .map_err(SummaryError::from)
                    .and_then(|text| require_text(text, GenerationStage::Chunk(index))),
                Err(e) => Err(SummaryError::Internal(format!(
                    "chunk {} task failed: {}",
                    index, e
                ))),
            };

            match outcome {
                Ok(text) => {
                    debug!("Collected partial message for chunk {}", index);
                    partials.push(text);
                }
                Err(err) => {
                    warn!("Chunk {} failed, aborting remaining requests: {}", index, err);
                    pending.by_ref().for_each(|(_, rest)| rest.abort());
                    return Err(err);
                }
            }
        }

        Ok(partials)
    }
}

fn require_text(text: Option<String>, stage: GenerationStage) -> Result<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(SummaryError::EmptyMessage { stage }),
    }
}
