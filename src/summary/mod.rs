//! Commit message drafting: direct or chunked-then-reduced generation

pub mod orchestrator;

pub use orchestrator::{SummaryMode, SummaryOrchestrator, SummaryPlan};
