use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use asr_stabilizer::{OnlineASRProcessor, SentenceSplitter};
use transcript_store::LanguageStore;

/// The unit of state: one active recording/transcription context. Owns its
/// processor and per-language stores exclusively; packets reference it only
/// by `session_id`.
pub struct Session {
    pub session_id: String,
    pub source_lang: String,
    pub transcript_lang: String,
    pub supported_langs: Vec<String>,
    pub stores: HashMap<String, LanguageStore>,
    pub processor: OnlineASRProcessor,
    pub tokenizer: Arc<dyn SentenceSplitter>,
    pub untranscribed_ids: Vec<u64>,
    pub transcribed_ids: Vec<u64>,
    pub save_path: PathBuf,
    max_buffer_seconds: f64,
}

impl Session {
    pub fn new(
        session_id: String,
        source_lang: String,
        transcript_lang: String,
        supported_langs: Vec<String>,
        tokenizer: Arc<dyn SentenceSplitter>,
        save_path: PathBuf,
        max_buffer_seconds: f64,
    ) -> Self {
        let stores = supported_langs
            .iter()
            .map(|lang| (lang.clone(), LanguageStore::new()))
            .collect();

        Self {
            session_id,
            source_lang,
            transcript_lang,
            supported_langs,
            stores,
            processor: OnlineASRProcessor::with_max_buffer_seconds(tokenizer.clone(), max_buffer_seconds),
            tokenizer,
            untranscribed_ids: Vec::new(),
            transcribed_ids: Vec::new(),
            save_path,
            max_buffer_seconds,
        }
    }

    pub fn store(&self, lang: &str) -> Option<&LanguageStore> {
        self.stores.get(lang)
    }

    pub fn store_mut(&mut self, lang: &str) -> Option<&mut LanguageStore> {
        self.stores.get_mut(lang)
    }

    /// Rebuilds the processor with a fresh tokenizer, keeping already
    /// committed text (which lives in `stores`, not the processor) intact.
    pub fn reset_processor(&mut self) {
        self.processor = OnlineASRProcessor::with_max_buffer_seconds(self.tokenizer.clone(), self.max_buffer_seconds);
    }

    pub fn set_tokenizer(&mut self, tokenizer: Arc<dyn SentenceSplitter>) {
        self.tokenizer = tokenizer;
        self.reset_processor();
    }
}

/// `recordings/<session_id>/<n>/` where `n` is the smallest non-negative
/// integer not already present as a subdirectory. Creates `audio/` and one
/// `text_chunks/<lang>/` + `final_transcripts/<lang>/` per supported
/// language. Best-effort: a failure here does not stop session creation,
/// only the on-disk mirror of its state.
pub fn allocate_save_path(recordings_root: &Path, session_id: &str, supported_langs: &[String]) -> PathBuf {
    let session_root = recordings_root.join(session_id);

    let mut n = 0u32;
    loop {
        let candidate = session_root.join(n.to_string());
        if !candidate.exists() {
            break;
        }
        n += 1;
    }
    let save_path = session_root.join(n.to_string());

    if let Err(e) = std::fs::create_dir_all(save_path.join("audio")) {
        tracing::warn!(error = %e, path = %save_path.display(), "failed to create audio directory");
    }
    for lang in supported_langs {
        if let Err(e) = std::fs::create_dir_all(save_path.join("text_chunks").join(lang)) {
            tracing::warn!(error = %e, lang = %lang, "failed to create text_chunks directory");
        }
        if let Err(e) = std::fs::create_dir_all(save_path.join("final_transcripts").join(lang)) {
            tracing::warn!(error = %e, lang = %lang, "failed to create final_transcripts directory");
        }
    }

    save_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_save_path_picks_smallest_free_index() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let session_id = "abc";
        let supported = vec!["en".to_string()];

        let first = allocate_save_path(tmp.path(), session_id, &supported);
        assert!(first.ends_with("0"));

        let second = allocate_save_path(tmp.path(), session_id, &supported);
        assert!(second.ends_with("1"));
    }
}
