//! Recursive decomposition of an oversized unified diff
//!
//! Splitting proceeds level by level, and only for units that exceed the
//! budget:
//! - file sections (`diff --git `), recombined with the segment merger
//! - hunks (`@@ `) of one file, each chunk prefixed with the file header
//! - lines, accumulated greedily
//! - characters, as a last resort for a single line over budget
//!
//! The segments of the returned chunks, concatenated in order, reproduce the
//! input exactly.

use super::models::{ChunkPrompt, DecomposeContext, FILE_MARKER, HUNK_MARKER};
use super::segment_merger::SegmentMerger;
use super::token_budget::BudgetError;
use super::token_estimator::TokenEstimator;
use std::sync::Arc;
use tracing::{debug, warn};

/// Piece of the partition plus the header it has to be sent with
struct Piece {
    segment: String,
    header: Option<String>,
}

impl Piece {
    fn bare(segment: String) -> Self {
        Self {
            segment,
            header: None,
        }
    }
}

/// Splits diffs into budget-respecting chunk prompts
#[derive(Clone)]
pub struct DiffDecomposer {
    estimator: Arc<dyn TokenEstimator>,
    merger: SegmentMerger,
}

impl DiffDecomposer {
    pub fn new(estimator: Arc<dyn TokenEstimator>) -> Self {
        let merger = SegmentMerger::new(estimator.clone());
        Self { estimator, merger }
    }

    /// Decompose `diff` into ordered chunks whose text fits `budget`.
    ///
    /// An empty diff yields no chunks. A diff without any file marker is
    /// treated as a single file section.
    pub fn decompose(
        &self,
        diff: &str,
        budget: usize,
        context: &DecomposeContext,
    ) -> Result<Vec<ChunkPrompt>, BudgetError> {
        if budget == 0 {
            return Err(BudgetError::ZeroBudget);
        }
        if diff.is_empty() {
            return Ok(Vec::new());
        }

        let sections = split_at_line_markers(diff, FILE_MARKER);
        let groups = self.merger.pack(&sections, budget);

        let mut pieces = Vec::new();
        for group in groups {
            if self.estimator.estimate(&group) <= budget {
                pieces.push(Piece::bare(group));
            } else {
                // the merger never combines over budget, so this is one file
                pieces.extend(self.split_file(&group, budget));
            }
        }

        debug!(
            "Decomposed diff of {} file sections into {} chunks (budget: {})",
            sections.len(),
            pieces.len(),
            budget
        );

        Ok(pieces
            .into_iter()
            .map(|p| ChunkPrompt::new(p.segment, p.header, context.clone()))
            .collect())
    }

    /// Hunk level: merge hunks under what the header leaves of the budget
    fn split_file(&self, section: &str, budget: usize) -> Vec<Piece> {
        let (header, body) = match find_line_marker(section, HUNK_MARKER) {
            Some(index) => section.split_at(index),
            None => (section, ""),
        };

        let header_cost = self.estimator.estimate(header);
        if body.is_empty() || header_cost >= budget {
            if !body.is_empty() {
                warn!(
                    "File header alone needs {} tokens (budget: {}), carrying only its marker line",
                    header_cost, budget
                );
            }
            return self.split_with_marker(section, budget);
        }

        let hunk_budget = budget - header_cost;
        let hunks = split_at_line_markers(body, HUNK_MARKER);

        let mut parts = Vec::new();
        for group in self.merger.pack(&hunks, hunk_budget) {
            let with_header = format!("{}{}", header, group);
            if self.estimator.estimate(&with_header) <= budget {
                parts.push(group);
            } else {
                parts.extend(self.split_lines(&group, hunk_budget));
            }
        }

        // the first piece owns the header, the rest repeat it
        parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    Piece::bare(format!("{}{}", header, part))
                } else {
                    Piece {
                        segment: part,
                        header: Some(header.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Line level for a section whose full header cannot be repeated: pieces
    /// after the first carry the `diff --git ` line when it fits
    fn split_with_marker(&self, section: &str, budget: usize) -> Vec<Piece> {
        let marker = section
            .split_inclusive('\n')
            .next()
            .filter(|line| line.starts_with(FILE_MARKER))
            .map(|line| (line, self.estimator.estimate(line)))
            .filter(|&(_, cost)| cost < budget);

        let (marker, marker_cost) = match marker {
            Some(marker) => marker,
            None => {
                return self
                    .split_lines(section, budget)
                    .into_iter()
                    .map(Piece::bare)
                    .collect();
            }
        };

        self.split_lines(section, budget - marker_cost)
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                if i == 0 {
                    Piece::bare(part)
                } else {
                    Piece {
                        segment: part,
                        header: Some(marker.to_string()),
                    }
                }
            })
            .collect()
    }

    /// Line level: greedy accumulation, with character slicing for lines
    /// that cannot fit on their own
    fn split_lines(&self, text: &str, budget: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut buffer = String::new();
        // sum of line costs; never below the estimate of the joined buffer
        let mut buffer_cost = 0;

        for line in text.split_inclusive('\n') {
            let mut line = line;

            if self.estimator.estimate(line) > budget && !buffer.is_empty() {
                out.push(std::mem::take(&mut buffer));
                buffer_cost = 0;
            }
            while self.estimator.estimate(line) > budget {
                let (head, tail) = self.slice_prefix(line, budget);
                out.push(head.to_string());
                line = tail;
            }
            if line.is_empty() {
                continue;
            }

            let line_cost = self.estimator.estimate(line);
            if !buffer.is_empty() && buffer_cost + line_cost > budget {
                out.push(std::mem::take(&mut buffer));
                buffer_cost = 0;
            }
            buffer.push_str(line);
            buffer_cost += line_cost;
        }

        if !buffer.is_empty() {
            out.push(buffer);
        }

        out
    }

    /// Cut `budget` characters off the front of `line`, narrowing further if
    /// the estimator still rates the slice over budget
    fn slice_prefix<'a>(&self, line: &'a str, budget: usize) -> (&'a str, &'a str) {
        let mut width = budget.max(1);
        loop {
            let end = line
                .char_indices()
                .nth(width)
                .map(|(i, _)| i)
                .unwrap_or(line.len());
            let (head, tail) = line.split_at(end);
            if width == 1 || self.estimator.estimate(head) <= budget {
                return (head, tail);
            }
            width /= 2;
        }
    }
}

/// Byte offsets where `marker` opens a line
fn line_marker_offsets(text: &str, marker: &str) -> Vec<usize> {
    text.match_indices(marker)
        .map(|(i, _)| i)
        .filter(|&i| i == 0 || text.as_bytes()[i - 1] == b'\n')
        .collect()
}

fn find_line_marker(text: &str, marker: &str) -> Option<usize> {
    line_marker_offsets(text, marker).into_iter().next()
}

/// Split before every line that starts with `marker`, keeping the marker.
/// Text before the first marker, if any, is its own leading piece.
fn split_at_line_markers<'a>(text: &'a str, marker: &str) -> Vec<&'a str> {
    let mut pieces = Vec::new();
    let mut prev = 0;
    for start in line_marker_offsets(text, marker) {
        if start > prev {
            pieces.push(&text[prev..start]);
        }
        prev = start;
    }
    if prev < text.len() {
        pieces.push(&text[prev..]);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::token_estimator::{CharRatioEstimator, TiktokenEstimator};

    fn decomposer() -> DiffDecomposer {
        DiffDecomposer::new(Arc::new(CharRatioEstimator::new(1)))
    }

    fn file_diff(name: &str, hunks: usize, lines_per_hunk: usize) -> String {
        let mut diff = format!("diff --git a/{name} b/{name}\nindex 83db48f..bf269f4 100644\n");
        diff.push_str(&format!("--- a/{name}\n+++ b/{name}\n"));
        for h in 0..hunks {
            let start = h * 10 + 1;
            diff.push_str(&format!("@@ -{},3 +{},4 @@ fn f{}()\n", start, start, h));
            for l in 0..lines_per_hunk {
                diff.push_str(&format!("+    let v{}_{} = {};\n", h, l, l));
            }
        }
        diff
    }

    fn assert_lossless(diff: &str, chunks: &[ChunkPrompt]) {
        let rebuilt: String = chunks.iter().map(|c| c.segment.as_str()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn test_zero_budget_fails() {
        let result =
            decomposer().decompose("diff --git a b\n", 0, &DecomposeContext::default());
        assert!(matches!(result, Err(BudgetError::ZeroBudget)));
    }

    #[test]
    fn test_empty_diff_yields_no_chunks() {
        let chunks = decomposer()
            .decompose("", 100, &DecomposeContext::default())
            .unwrap();
        assert!(chunks.is_empty());
    }

    #[test]
    fn test_small_diff_is_one_chunk() {
        let diff = file_diff("a.rs", 1, 2);
        let chunks = decomposer()
            .decompose(&diff, 10_000, &DecomposeContext::default())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text(), diff);
    }

    #[test]
    fn test_small_files_are_merged() {
        let a = file_diff("a.rs", 1, 1);
        let b = file_diff("b.rs", 1, 1);
        let c = file_diff("c.rs", 1, 1);
        let diff = format!("{a}{b}{c}");
        let budget = a.len() + b.len() + 5;
        let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].segment, format!("{a}{b}"));
        assert_eq!(chunks[1].segment, c);
        assert_lossless(&diff, &chunks);
    }

    #[test]
    fn test_large_file_split_by_hunks_carries_header() {
        let diff = file_diff("big.rs", 6, 4);
        let budget = 200;
        let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();

        assert!(chunks.len() > 1);
        assert!(!chunks[0].carries_header());
        assert!(chunks[0].segment.starts_with("diff --git a/big.rs"));
        for chunk in &chunks[1..] {
            assert!(chunk.carries_header());
            assert!(chunk.segment.starts_with("@@ "));
            assert!(chunk.text().starts_with("diff --git a/big.rs"));
        }
        for chunk in &chunks {
            assert!(chunk.text().chars().count() <= budget);
        }
        assert_lossless(&diff, &chunks);
    }

    #[test]
    fn test_single_huge_hunk_goes_to_line_level() {
        let diff = file_diff("huge.rs", 1, 40);
        let budget = 150;
        let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();

        assert!(chunks.len() > 2);
        for chunk in &chunks {
            assert!(chunk.text().chars().count() <= budget);
        }
        assert_lossless(&diff, &chunks);
    }

    #[test]
    fn test_lossless_and_within_budget_across_budgets() {
        let diff = format!(
            "{}{}{}",
            file_diff("a.rs", 3, 5),
            file_diff("b.rs", 1, 30),
            file_diff("c.rs", 8, 2)
        );
        for budget in [120, 150, 200, 333, 800, 5000] {
            let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();
            assert_lossless(&diff, &chunks);
            for chunk in &chunks {
                assert!(
                    chunk.text().chars().count() <= budget,
                    "chunk over budget {}: {}",
                    budget,
                    chunk.text().len()
                );
            }
        }
    }

    #[test]
    fn test_oversized_single_line_is_sliced() {
        let long_line = format!("+{}\n", "x".repeat(500));
        let diff = format!(
            "diff --git a/min.js b/min.js\n--- a/min.js\n+++ b/min.js\n@@ -1 +1 @@\n{long_line}"
        );
        let budget = 100;
        let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();

        assert_lossless(&diff, &chunks);
        let slices: Vec<&ChunkPrompt> = chunks
            .iter()
            .filter(|c| c.segment.chars().all(|ch| ch == 'x' || ch == '+' || ch == '\n'))
            .collect();
        assert!(slices.len() >= 5);
        let rejoined: String = chunks
            .iter()
            .map(|c| c.segment.as_str())
            .collect::<String>();
        assert!(rejoined.contains(&long_line));
        for chunk in &chunks {
            assert!(chunk.segment.chars().count() <= budget);
        }
    }

    #[test]
    fn test_diff_without_file_markers() {
        let diff = "@@ -1 +1 @@\n-a\n+b\n@@ -9 +9 @@\n-c\n+d\n";
        let chunks = decomposer()
            .decompose(diff, 18, &DecomposeContext::default())
            .unwrap();
        assert_eq!(chunks.len(), 2);
        assert_lossless(diff, &chunks);
    }

    #[test]
    fn test_preamble_before_first_file_is_kept() {
        let diff = format!("staged changes\n{}", file_diff("a.rs", 1, 1));
        let chunks = decomposer()
            .decompose(&diff, 10_000, &DecomposeContext::default())
            .unwrap();
        assert_eq!(chunks.len(), 1);
        assert_lossless(&diff, &chunks);
    }

    #[test]
    fn test_context_is_attached() {
        let context = DecomposeContext::new("PROJ-42", "de");
        let diff = file_diff("a.rs", 4, 6);
        let chunks = decomposer().decompose(&diff, 150, &context).unwrap();
        assert!(chunks.iter().all(|c| c.context == context));
    }

    #[test]
    fn test_oversized_header_carries_marker_line() {
        let marker = "diff --git a/x.rs b/x.rs\n";
        let mut diff = marker.to_string();
        diff.push_str("old mode 100644\nnew mode 100755\nsimilarity index 90%\n");
        diff.push_str("rename from a/old_name.rs\nrename to a/x.rs\n");
        diff.push_str("@@ -1 +1 @@\n-a\n+b\n");
        let budget = 60;
        let chunks = decomposer()
            .decompose(&diff, budget, &DecomposeContext::default())
            .unwrap();

        assert!(chunks.len() > 1);
        assert!(!chunks[0].carries_header());
        assert!(chunks[0].segment.starts_with(marker));
        for chunk in &chunks[1..] {
            assert_eq!(chunk.header.as_deref(), Some(marker));
            assert!(chunk.text().starts_with(marker));
        }
        for chunk in &chunks {
            assert!(chunk.text().chars().count() <= budget);
        }
        assert_lossless(&diff, &chunks);
    }

    #[test]
    fn test_marker_line_over_budget_is_not_carried() {
        let diff = "diff --git a/long_name.rs b/long_name.rs\n@@ -1 +1 @@\n-a\n+b\n";
        let budget = 20;
        let chunks = decomposer()
            .decompose(diff, budget, &DecomposeContext::default())
            .unwrap();

        assert!(chunks.iter().all(|c| !c.carries_header()));
        for chunk in &chunks {
            assert!(chunk.text().chars().count() <= budget);
        }
        assert_lossless(diff, &chunks);
    }

    #[test]
    fn test_tiktoken_multibyte_diff_within_budget() {
        let estimator: Arc<dyn TokenEstimator> = Arc::new(TiktokenEstimator::new().unwrap());
        let decomposer = DiffDecomposer::new(estimator.clone());

        let files = [
            ("文档/说明.md", "+更新了配置说明，支持多语言提交信息生成"),
            ("src/status.rs", "+    let status = \"✅ 完成 🚀 部署 🐛 修复\";"),
            ("README.md", "+Ünïcödé çhäràctérs ånd ñoñ-ASCII téxt"),
        ];
        let mut diff = String::new();
        for (name, line) in files {
            diff.push_str(&format!("diff --git a/{name} b/{name}\n--- a/{name}\n+++ b/{name}\n"));
            for h in 0..3 {
                diff.push_str(&format!("@@ -{0},2 +{0},3 @@\n", h * 10 + 1));
                for l in 0..6 {
                    diff.push_str(&format!("{} {}\n", line, l));
                }
            }
        }

        for budget in [100, 160, 250, 1000] {
            let chunks = decomposer
                .decompose(&diff, budget, &DecomposeContext::default())
                .unwrap();
            assert_lossless(&diff, &chunks);
            for chunk in &chunks {
                let cost = estimator.estimate(&chunk.text());
                assert!(cost <= budget, "chunk of {} tokens over budget {}", cost, budget);
            }
        }
    }

    #[test]
    fn test_marker_inside_line_is_not_a_boundary() {
        let text = "a diff --git b\ndiff --git c\n";
        assert_eq!(
            split_at_line_markers(text, FILE_MARKER),
            vec!["a diff --git b\n", "diff --git c\n"]
        );
    }
}
