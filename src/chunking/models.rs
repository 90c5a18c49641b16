//! Data models for diff decomposition

use serde::{Deserialize, Serialize};

/// Marker that opens every file section of a unified git diff
pub const FILE_MARKER: &str = "diff --git ";

/// Marker that opens every hunk inside a file section
pub const HUNK_MARKER: &str = "@@ ";

/// Context attached to every chunk so it can be summarized on its own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecomposeContext {
    pub issue_id: String,
    pub locale: String,
}

impl DecomposeContext {
    pub fn new(issue_id: impl Into<String>, locale: impl Into<String>) -> Self {
        Self {
            issue_id: issue_id.into(),
            locale: locale.into(),
        }
    }
}

/// A budget-respecting fragment of a diff, ready to be sent on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPrompt {
    /// Exact span of the source diff owned by this chunk
    pub segment: String,
    /// File header repeated in front of the segment when the segment
    /// does not start with it
    pub header: Option<String>,
    pub context: DecomposeContext,
}

impl ChunkPrompt {
    pub fn new(segment: String, header: Option<String>, context: DecomposeContext) -> Self {
        Self {
            segment,
            header: header.filter(|h| !h.is_empty()),
            context,
        }
    }

    /// Text sent to the generation service
    pub fn text(&self) -> String {
        match &self.header {
            Some(header) => format!("{}{}", header, self.segment),
            None => self.segment.clone(),
        }
    }

    /// Whether the chunk repeats a file header it does not own
    pub fn carries_header(&self) -> bool {
        self.header.is_some()
    }
}
