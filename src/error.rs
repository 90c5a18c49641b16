//! Error types for commit message generation

use crate::chunking::token_budget::BudgetError;
use crate::config::ConfigError;
use crate::generation::GenerationError;
use std::fmt;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, SummaryError>;

/// Which generation call produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    Direct,
    Chunk(usize),
    Reduce,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationStage::Direct => write!(f, "direct"),
            GenerationStage::Chunk(index) => write!(f, "chunk {}", index),
            GenerationStage::Reduce => write!(f, "reduce"),
        }
    }
}

/// Errors raised while turning a diff into a commit message
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(
        "Output token reservation is too high: {max_output} output tokens leave a request budget of {budget} within {max_input} input tokens"
    )]
    OutputTokensTooHigh {
        max_input: usize,
        max_output: usize,
        budget: i64,
    },

    #[error("Generation service returned an empty message ({stage})")]
    EmptyMessage { stage: GenerationStage },

    #[error("Diff needs {tokens} tokens but a single request allows {max}")]
    TooMuchTokens { tokens: usize, max: usize },

    #[error("Nothing to summarize: the diff is empty")]
    EmptyDiff,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BudgetError> for SummaryError {
    fn from(err: BudgetError) -> Self {
        match err {
            BudgetError::OutputTokensTooHigh {
                max_input,
                max_output,
                budget,
            } => SummaryError::OutputTokensTooHigh {
                max_input,
                max_output,
                budget,
            },
            BudgetError::BudgetExceeded { used, max } => {
                SummaryError::TooMuchTokens { tokens: used, max }
            }
            BudgetError::ZeroBudget | BudgetError::EstimatorUnavailable(_) => {
                SummaryError::Configuration(err.to_string())
            }
        }
    }
}

impl From<ConfigError> for SummaryError {
    fn from(err: ConfigError) -> Self {
        SummaryError::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_error_conversion() {
        let err: SummaryError = BudgetError::OutputTokensTooHigh {
            max_input: 100,
            max_output: 60,
            budget: -10,
        }
        .into();
        assert!(matches!(err, SummaryError::OutputTokensTooHigh { budget: -10, .. }));

        let err: SummaryError = BudgetError::BudgetExceeded { used: 10, max: 5 }.into();
        assert!(matches!(err, SummaryError::TooMuchTokens { tokens: 10, max: 5 }));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(GenerationStage::Chunk(2).to_string(), "chunk 2");
        assert_eq!(GenerationStage::Reduce.to_string(), "reduce");
    }
}
