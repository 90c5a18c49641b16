//! Greedy, order-preserving packing of text segments under a token budget

use super::token_estimator::TokenEstimator;
use std::sync::Arc;
use tracing::debug;

/// Merges consecutive segments into the fewest groups that fit a budget
#[derive(Clone)]
pub struct SegmentMerger {
    estimator: Arc<dyn TokenEstimator>,
}

impl SegmentMerger {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        Self { estimator }
    }

    /// Pack `segments` in a single pass.
    ///
    /// Each output is the concatenation of one or more consecutive inputs.
    /// A segment that alone exceeds `budget` is emitted by itself, untouched,
    /// so the caller can split it further.
    pub fn pack<S: AsRef<str>>(&self, segments: &[S], budget: usize) -> Vec<String> {
        let mut groups = Vec::new();
        let mut acc = String::new();

        for segment in segments {
            let segment = segment.as_ref();
            if acc.is_empty() {
                acc.push_str(segment);
                continue;
            }

            let candidate = format!("{}{}", acc, segment);
            if self.estimator.estimate(&candidate) <= budget {
                acc = candidate;
            } else {
                groups.push(std::mem::take(&mut acc));
                acc.push_str(segment);
            }
        }

        if !acc.is_empty() {
            groups.push(acc);
        }

        debug!(
            "Packed {} segments into {} groups (budget: {})",
            segments.len(),
            groups.len(),
            budget
        );

        groups
    }
}
