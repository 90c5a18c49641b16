//! Request budget derivation
//!
//! The variable part of a generation request (the diff or one chunk of it)
//! may occupy whatever remains of the model's input window after:
//! - the fixed prompt messages (system instruction, examples)
//! - the completion reservation (`max_output`)
//! - a small adjustment factor for chat-format framing

use super::token_estimator::TokenEstimator;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token limits of the generation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenBudgetConfig {
    /// Maximum input tokens accepted by the model
    #[serde(default = "default_max_input")]
    pub max_input: usize,

    /// Tokens reserved for the completion
    #[serde(default = "default_max_output")]
    pub max_output: usize,

    /// Safety margin subtracted from every request budget
    #[serde(default = "default_adjustment_factor")]
    pub adjustment_factor: usize,

    /// Framing cost charged per chat message
    #[serde(default = "default_per_message_overhead")]
    pub per_message_overhead: usize,
}

fn default_max_input() -> usize {
    4096
}

fn default_max_output() -> usize {
    500
}

fn default_adjustment_factor() -> usize {
    20
}

fn default_per_message_overhead() -> usize {
    4
}

impl Default for TokenBudgetConfig {
    fn default() -> Self {
        Self {
            max_input: default_max_input(),
            max_output: default_max_output(),
            adjustment_factor: default_adjustment_factor(),
            per_message_overhead: default_per_message_overhead(),
        }
    }
}

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Budget exceeded: {used} tokens used, {max} tokens allowed")]
    BudgetExceeded { used: usize, max: usize },

    #[error(
        "Output tokens too high: reserving {max_output} of {max_input} input tokens leaves a budget of {budget}"
    )]
    OutputTokensTooHigh {
        max_input: usize,
        max_output: usize,
        budget: i64,
    },

    #[error("Budget must be positive")]
    ZeroBudget,

    #[error("Token estimator unavailable: {0}")]
    EstimatorUnavailable(String),
}

/// Token budget manager
#[derive(Debug, Clone)]
pub struct TokenBudgetManager {
    config: TokenBudgetConfig,
}

impl TokenBudgetManager {
    pub fn new(config: TokenBudgetConfig) -> Self {
        Self { config }
    }

    /// Cost of a fixed prompt: every message content plus its framing overhead
    pub fn prompt_overhead(&self, estimator: &dyn TokenEstimator, contents: &[&str]) -> usize {
        contents
            .iter()
            .map(|c| estimator.estimate(c) + self.config.per_message_overhead)
            .sum()
    }

    /// Tokens left for the variable part of a request
    ///
    /// Fails when the completion reservation alone leaves nothing, which is a
    /// misconfiguration rather than a retryable condition.
    pub fn request_budget(&self, prompt_overhead: usize) -> Result<usize, BudgetError> {
        let budget = self.config.max_input as i64
            - self.config.adjustment_factor as i64
            - prompt_overhead as i64
            - self.config.max_output as i64;

        if budget <= 0 {
            return Err(BudgetError::OutputTokensTooHigh {
                max_input: self.config.max_input,
                max_output: self.config.max_output,
                budget,
            });
        }

        Ok(budget as usize)
    }

    /// Check if a given token count fits within the budget
    pub fn check_budget(&self, tokens: usize, budget: usize) -> Result<(), BudgetError> {
        if tokens > budget {
            return Err(BudgetError::BudgetExceeded {
                used: tokens,
                max: budget,
            });
        }
        Ok(())
    }

    /// Largest whole request (all messages) the service accepts
    pub fn max_request_tokens(&self) -> usize {
        self.config.max_input.saturating_sub(self.config.max_output)
    }

    /// Get the configuration
    pub fn config(&self) -> &TokenBudgetConfig {
        &self.config
    }
}
