//! Diff decomposition under a token budget
//!
//! A staged diff that does not fit one request is cut into file sections,
//! then hunks, then lines, then character slices, until every piece fits.
//! Adjacent pieces are merged back greedily so the chunk count stays low.

pub mod decomposer;
pub mod models;
pub mod segment_merger;
pub mod token_budget;
pub mod token_estimator;

pub use decomposer::DiffDecomposer;
pub use models::{ChunkPrompt, DecomposeContext};
pub use segment_merger::SegmentMerger;
pub use token_budget::{BudgetError, TokenBudgetConfig, TokenBudgetManager};
pub use token_estimator::{CharRatioEstimator, TiktokenEstimator, TokenEstimator};
