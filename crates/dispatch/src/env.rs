use serde::Deserialize;

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_recordings_dir() -> String {
    "recordings".to_string()
}

fn default_worker_timeout_secs() -> u64 {
    15
}

fn default_max_buffer_secs() -> f64 {
    30.0
}

fn default_hard_reset_secs() -> f64 {
    45.0
}

fn default_source_lang() -> String {
    "cs".to_string()
}

fn default_transcript_lang() -> String {
    "cs".to_string()
}

fn default_supported_langs() -> Vec<String> {
    vec!["cs".to_string(), "en".to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct Env {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: String,
    #[serde(default = "default_worker_timeout_secs")]
    pub worker_timeout_secs: u64,
    #[serde(default = "default_max_buffer_secs")]
    pub max_buffer_secs: f64,
    #[serde(default = "default_hard_reset_secs")]
    pub hard_reset_secs: f64,
    /// Matches the original server's `Session` defaults: new sessions start
    /// in Czech until a client calls `/switch_*_language`.
    #[serde(default = "default_source_lang")]
    pub default_source_lang: String,
    #[serde(default = "default_transcript_lang")]
    pub default_transcript_lang: String,
    #[serde(default = "default_supported_langs")]
    pub default_supported_langs: Vec<String>,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            recordings_dir: default_recordings_dir(),
            worker_timeout_secs: default_worker_timeout_secs(),
            max_buffer_secs: default_max_buffer_secs(),
            hard_reset_secs: default_hard_reset_secs(),
            default_source_lang: default_source_lang(),
            default_transcript_lang: default_transcript_lang(),
            default_supported_langs: default_supported_langs(),
        }
    }
}
