mod hypothesis;
mod processor;
mod tokenizer;
mod word;

pub use hypothesis::HypothesisBuffer;
pub use processor::{OnlineASRProcessor, HARD_RESET_SECONDS, MAX_BUFFER_SECONDS, SAMPLING_RATE};
pub use tokenizer::{CjkSplitter, PunctuationSplitter, SentenceSplitter, TokenizerRegistry, UnknownLanguage};
pub use word::Word;
