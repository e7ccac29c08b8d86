use serde::{Deserialize, Serialize};

/// (start, end) in seconds. Invariant: 0 <= start <= end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timespan {
    pub start: f64,
    pub end: f64,
}

impl Timespan {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }
}

/// A single transcript record. Immutable once appended; edits create a new
/// version in the same chain rather than mutating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextUnit {
    pub text: String,
    pub chunk_id: u32,
    pub timespan: Timespan,
    pub version: u32,
    pub rating: i64,
}

/// Append-only ordered sequence of `TextUnit` sharing one chunk id.
/// `chain[i].version == i` and `chain[i].timespan == chain[0].timespan`
/// for every i, enforced by `LanguageStore` rather than this alias.
pub type VersionChain = Vec<TextUnit>;

/// One entry of a `getLatestTextChunks` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunkView {
    pub chunk_id: u32,
    pub version: u32,
    pub text: String,
}

/// A correction-rule source string and whether it is currently active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceString {
    pub text: String,
    pub active: bool,
}

/// A rewrite rule: one or more candidate source strings mapping to a single
/// replacement. Effective iff at least one source is active and non-empty
/// and the replacement is non-empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub sources: Vec<SourceString>,
    pub replacement: String,
}

impl CorrectionRule {
    pub fn is_effective(&self) -> bool {
        !self.replacement.is_empty()
            && self
                .sources
                .iter()
                .any(|s| s.active && !s.text.is_empty())
    }

    /// Drops empty source strings, keeping active/inactive flags on the rest.
    pub fn with_empty_sources_dropped(mut self) -> Self {
        self.sources.retain(|s| !s.text.is_empty());
        self
    }
}
