//! Commit message drafting for staged diffs of any size
//!
//! Diffs that fit one request are sent as-is. Larger diffs are decomposed into
//! budget-sized chunks, each chunk gets a partial commit message, and a final
//! request merges the partials into one message.

pub mod chunking;
pub mod config;
pub mod error;
pub mod generation;
pub mod metrics;
pub mod summary;

pub use config::Config;
pub use error::{GenerationStage, Result, SummaryError};
pub use generation::{ChatMessage, GenerationClient, GenerationError};
pub use summary::{SummaryMode, SummaryOrchestrator, SummaryPlan};
