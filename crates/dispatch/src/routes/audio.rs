use std::collections::BTreeMap;
use std::io::Cursor;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;

use super::session::{require_session_id, SessionIdQuery};
use super::AppState;

/// Raw PCM samples arrive keyed by stringified index, with either integer
/// (int16-range) or float (already normalized) values per sample.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSample {
    Int(i64),
    Float(f64),
}

impl RawSample {
    /// Integers are int16-range PCM and get normalized to [-1.0, 1.0];
    /// floats are assumed already normalized.
    fn normalize(&self) -> f32 {
        match self {
            RawSample::Int(v) => (*v as f64 / 32768.0) as f32,
            RawSample::Float(v) => *v as f32,
        }
    }
}

#[derive(Deserialize)]
pub struct SubmitAudioChunkBody {
    pub timestamp: i64,
    pub chunk: BTreeMap<String, RawSample>,
}

#[derive(Serialize)]
pub struct SessionIdResponse {
    pub success: bool,
    pub session_id: String,
}

/// Samples are keyed by stringified index in the wire payload; they are
/// reassembled here in index order before being handed to the processor.
fn ordered_samples(chunk: BTreeMap<String, RawSample>) -> Result<Vec<f32>, RouteError> {
    let mut indexed: Vec<(u64, f32)> = chunk
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u64>()
                .map(|idx| (idx, v.normalize()))
                .map_err(|_| RouteError::BadRequest(format!("invalid chunk sample index {k:?}")))
        })
        .collect::<Result<_, _>>()?;
    indexed.sort_by_key(|(idx, _)| *idx);
    Ok(indexed.into_iter().map(|(_, sample)| sample).collect())
}

pub async fn submit_audio_chunk(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
    Json(body): Json<SubmitAudioChunkBody>,
) -> Result<Json<SessionIdResponse>, RouteError> {
    let session_id = require_session_id(&query)?.to_string();
    let samples = ordered_samples(body.chunk)?;

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.submit_audio_chunk(&session_id, body.timestamp, samples)?;
    Ok(Json(SessionIdResponse { success: true, session_id }))
}

#[derive(Serialize)]
pub struct SubmitAudioFileResponse {
    pub success: bool,
    pub session_id: String,
}

/// Accepts a single 16kHz mono WAV file under the `file` multipart field;
/// every other sample rate is rejected.
pub async fn submit_audio_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<SubmitAudioFileResponse>, RouteError> {
    let mut wav_bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RouteError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| RouteError::BadRequest(format!("failed to read file field: {e}")))?;
            wav_bytes = Some(bytes.to_vec());
        }
    }

    let Some(wav_bytes) = wav_bytes else {
        return Err(RouteError::BadRequest("No file part".into()));
    };
    if wav_bytes.is_empty() {
        return Err(RouteError::BadRequest("No selected file".into()));
    }

    let reader = hound::WavReader::new(Cursor::new(wav_bytes))
        .map_err(|e| RouteError::BadRequest(format!("not a valid WAV file: {e}")))?;
    let spec = reader.spec();
    if spec.sample_rate != 16_000 {
        return Err(RouteError::BadRequest(format!(
            "Wrong sample rate: {} instead of 16000",
            spec.sample_rate
        )));
    }

    let samples = decode_samples(reader)
        .map_err(|e| RouteError::BadRequest(format!("failed to decode WAV samples: {e}")))?;

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    let session_id = dispatcher.submit_audio_file(samples);
    Ok(Json(SubmitAudioFileResponse { success: true, session_id }))
}

fn decode_samples(mut reader: hound::WavReader<Cursor<Vec<u8>>>) -> Result<Vec<f32>, hound::Error> {
    use hound::SampleFormat;

    match reader.spec().sample_format {
        SampleFormat::Float => reader.samples::<f32>().collect(),
        SampleFormat::Int => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect(),
    }
}
