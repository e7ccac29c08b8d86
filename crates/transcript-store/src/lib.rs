mod rules;
mod srt;
mod store;
mod types;

pub use rules::{rewrite, Rewriter};
pub use srt::{break_line, format_timestamp, render_unit, write_srt};
pub use store::{LanguageStore, StoreError};
pub use types::{CorrectionRule, SourceString, TextChunkView, TextUnit, Timespan, VersionChain};
