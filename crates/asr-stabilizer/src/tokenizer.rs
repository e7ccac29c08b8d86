use std::collections::HashMap;
use std::sync::Arc;

/// A language's sentence-boundary capability. Workers own the real NLP
/// (VAD, per-language tokenizers); the server only needs `split` to decide
/// where committed text may be chunked.
pub trait SentenceSplitter: Send + Sync {
    fn split(&self, text: &str) -> Vec<String>;
}

/// Splits on `.`, `!`, `?` followed by whitespace (or end of string),
/// keeping the terminator attached to the sentence it ends.
pub struct PunctuationSplitter;

impl SentenceSplitter for PunctuationSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();

        let chars: Vec<char> = text.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let ch = chars[i];
            current.push(ch);
            if matches!(ch, '.' | '!' | '?') {
                let next_is_boundary = chars.get(i + 1).map(|c| c.is_whitespace()).unwrap_or(true);
                if next_is_boundary {
                    sentences.push(current.trim().to_string());
                    current.clear();
                }
            }
            i += 1;
        }
        if !current.trim().is_empty() {
            sentences.push(current.trim().to_string());
        }
        sentences
    }
}

/// Splits on the CJK full-width sentence terminators `。`, `！`, `？`.
pub struct CjkSplitter;

impl SentenceSplitter for CjkSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut current = String::new();
        for ch in text.chars() {
            current.push(ch);
            if matches!(ch, '。' | '！' | '？') {
                sentences.push(current.trim().to_string());
                current.clear();
            }
        }
        if !current.trim().is_empty() {
            sentences.push(current.trim().to_string());
        }
        sentences
    }
}

#[derive(Debug, thiserror::Error)]
#[error("no sentence splitter registered for language {0:?}")]
pub struct UnknownLanguage(pub String);

/// Language code -> sentence splitter. Unsupported languages fail fast at
/// lookup rather than silently falling back to a default.
pub struct TokenizerRegistry {
    splitters: HashMap<String, Arc<dyn SentenceSplitter>>,
}

impl TokenizerRegistry {
    pub fn new() -> Self {
        Self {
            splitters: HashMap::new(),
        }
    }

    /// A registry with the splitters this server ships out of the box.
    /// Enough to run standalone and in tests; real per-language NLP is a
    /// worker concern.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        let punctuation: Arc<dyn SentenceSplitter> = Arc::new(PunctuationSplitter);
        for lang in ["en", "es", "fr", "de", "pt", "it", "nl", "cs"] {
            registry.register(lang, punctuation.clone());
        }
        registry.register("zh", Arc::new(CjkSplitter));
        registry.register("ja", Arc::new(CjkSplitter));
        registry
    }

    pub fn register(&mut self, lang: impl Into<String>, splitter: Arc<dyn SentenceSplitter>) {
        self.splitters.insert(lang.into(), splitter);
    }

    pub fn get(&self, lang: &str) -> Result<Arc<dyn SentenceSplitter>, UnknownLanguage> {
        self.splitters
            .get(lang)
            .cloned()
            .ok_or_else(|| UnknownLanguage(lang.to_string()))
    }
}

impl Default for TokenizerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_splitter_keeps_terminator() {
        let sentences = PunctuationSplitter.split("Hello there. How are you? Fine!");
        assert_eq!(sentences, vec!["Hello there.", "How are you?", "Fine!"]);
    }

    #[test]
    fn cjk_splitter_on_fullwidth_terminators() {
        let sentences = CjkSplitter.split("你好。今天天气怎么样？很好！");
        assert_eq!(sentences, vec!["你好。", "今天天气怎么样？", "很好！"]);
    }

    #[test]
    fn registry_fails_fast_on_unknown_language() {
        let registry = TokenizerRegistry::with_defaults();
        assert!(registry.get("en").is_ok());
        assert!(registry.get("xx-unsupported").is_err());
    }
}
