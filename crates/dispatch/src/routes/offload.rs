use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use transcript_store::Timespan;

use crate::error::RouteError;
use asr_stabilizer::Word;

use super::AppState;

#[derive(Serialize)]
#[serde(untagged)]
pub enum OffloadTranscribeResponse {
    Packet {
        success: bool,
        session_id: String,
        timestamp: u64,
        source_language: String,
        transcript_language: String,
        prompt: String,
        audio: Vec<f32>,
        is_file: bool,
    },
    Empty {
        success: bool,
        timestamp: Option<u64>,
        audio: Vec<f32>,
    },
}

/// A worker polls this to pick up the next due transcription job; an empty
/// envelope (`timestamp: null`) means nothing is currently due.
pub async fn pull_transcribe(State(state): State<AppState>) -> Json<OffloadTranscribeResponse> {
    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    let now = std::time::Instant::now();
    match dispatcher.pull_transcribe(now) {
        Some(packet) => Json(OffloadTranscribeResponse::Packet {
            success: true,
            session_id: packet.session_id,
            timestamp: packet.packet_id,
            source_language: packet.source_lang,
            transcript_language: packet.transcript_lang,
            prompt: packet.prompt,
            audio: packet.audio,
            is_file: packet.is_file,
        }),
        None => Json(OffloadTranscribeResponse::Empty {
            success: true,
            timestamp: None,
            audio: Vec::new(),
        }),
    }
}

/// `(start, end, text)` as produced by an ASR worker.
type WordTriple = (f64, f64, String);

#[derive(Deserialize)]
pub struct PostTranscribeBody {
    pub session_id: String,
    pub timestamp: u64,
    #[serde(default)]
    pub is_file: bool,
    pub tsw: Vec<WordTriple>,
    pub ends: Vec<f64>,
    pub language: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

pub async fn post_transcribe(
    State(state): State<AppState>,
    Json(body): Json<PostTranscribeBody>,
) -> Result<Json<SuccessResponse>, RouteError> {
    let words: Vec<Word> = body
        .tsw
        .into_iter()
        .map(|(start, end, text)| Word::new(start, end, text))
        .collect();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.post_transcribe(&body.session_id, body.timestamp, words, body.ends, &body.language)?;
    Ok(Json(SuccessResponse { success: true }))
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum OffloadTranslateResponse {
    Packet {
        success: bool,
        session_id: String,
        timestamp: u64,
        source_language: String,
        target_languages: Vec<String>,
        source_text: String,
        timespan: Timespan,
    },
    Empty(Option<()>),
}

pub async fn pull_translate(State(state): State<AppState>) -> Json<OffloadTranslateResponse> {
    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    let now = std::time::Instant::now();
    match dispatcher.pull_translate(now) {
        Some(packet) => Json(OffloadTranslateResponse::Packet {
            success: true,
            session_id: packet.session_id,
            timestamp: packet.packet_id,
            source_language: packet.source_lang,
            target_languages: packet.target_langs,
            source_text: packet.source_text,
            timespan: packet.timespan,
        }),
        None => Json(OffloadTranslateResponse::Empty(None)),
    }
}

#[derive(Deserialize)]
pub struct PostTranslateBody {
    pub session_id: String,
    pub timestamp: u64,
    pub translated_text: std::collections::HashMap<String, String>,
    pub timespan: Timespan,
}

pub async fn post_translate(
    State(state): State<AppState>,
    Json(body): Json<PostTranslateBody>,
) -> Result<Json<SuccessResponse>, RouteError> {
    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.post_translate(&body.session_id, body.timestamp, body.translated_text, body.timespan)?;
    Ok(Json(SuccessResponse { success: true }))
}
