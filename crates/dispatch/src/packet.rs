use std::time::{Duration, Instant};

use transcript_store::Timespan;

/// One entry in the global transcribe queue. `sent_out_time: None` is the
/// spec's "0" (never offered); `received` replaces the null/"received"
/// transcript marker.
#[derive(Debug, Clone)]
pub struct TranscribePacket {
    pub session_id: String,
    pub packet_id: u64,
    pub source_lang: String,
    pub transcript_lang: String,
    pub prompt: String,
    pub audio: Vec<f32>,
    pub is_file: bool,
    pub sent_out_time: Option<Instant>,
    pub received: bool,
}

impl TranscribePacket {
    pub fn is_due(&self, now: Instant, timeout: Duration) -> bool {
        match self.sent_out_time {
            None => true,
            Some(t) => now.duration_since(t) > timeout,
        }
    }
}

/// One entry in the global translate queue.
#[derive(Debug, Clone)]
pub struct TranslatePacket {
    pub session_id: String,
    pub packet_id: u64,
    pub source_lang: String,
    pub target_langs: Vec<String>,
    pub source_text: String,
    pub timespan: Timespan,
    pub sent_out_time: Option<Instant>,
    pub received: bool,
}

impl TranslatePacket {
    pub fn is_due(&self, now: Instant, timeout: Duration) -> bool {
        match self.sent_out_time {
            None => true,
            Some(t) => now.duration_since(t) > timeout,
        }
    }
}
