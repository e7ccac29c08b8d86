use std::path::PathBuf;
use std::time::Duration;

use crate::env::Env;

#[derive(Clone)]
pub struct DispatchConfig {
    pub recordings_dir: PathBuf,
    pub worker_timeout: Duration,
    pub max_buffer_seconds: f64,
    pub hard_reset_seconds: f64,
    pub default_source_lang: String,
    pub default_transcript_lang: String,
    pub default_supported_langs: Vec<String>,
}

impl DispatchConfig {
    pub fn new(env: &Env) -> Self {
        Self {
            recordings_dir: PathBuf::from(&env.recordings_dir),
            worker_timeout: Duration::from_secs(env.worker_timeout_secs),
            max_buffer_seconds: env.max_buffer_secs,
            hard_reset_seconds: env.hard_reset_secs,
            default_source_lang: env.default_source_lang.clone(),
            default_transcript_lang: env.default_transcript_lang.clone(),
            default_supported_langs: env.default_supported_langs.clone(),
        }
    }

    pub fn with_recordings_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.recordings_dir = dir.into();
        self
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self::new(&Env::default())
    }
}
