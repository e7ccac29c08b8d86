use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;

use super::session::{require_session_and_language, LanguageQuery};
use super::AppState;

/// The wire name for a chunk id is `timestamp`, carried over from the
/// original API (a text chunk's id doubles as the audio second it was cut
/// at for most of the session's life).
#[derive(Serialize, utoipa::ToSchema)]
pub struct TextChunkWire {
    pub timestamp: u32,
    pub version: u32,
    pub text: String,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct GetLatestTextChunksBody {
    pub versions: BTreeMap<String, u32>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct GetLatestTextChunksResponse {
    pub success: bool,
    pub session_id: String,
    pub text_chunks: Vec<TextChunkWire>,
    pub versions: BTreeMap<String, u32>,
}

#[derive(Serialize)]
pub struct VersionsResponse {
    pub success: bool,
    pub session_id: String,
    pub versions: BTreeMap<String, u32>,
}

fn parse_known_versions(versions: BTreeMap<String, u32>) -> Result<BTreeMap<u32, u32>, RouteError> {
    versions
        .into_iter()
        .map(|(k, v)| {
            k.parse::<u32>()
                .map(|id| (id, v))
                .map_err(|_| RouteError::BadRequest(format!("invalid chunk id {k:?}")))
        })
        .collect()
}

fn stringify_versions(versions: BTreeMap<u32, u32>) -> BTreeMap<String, u32> {
    versions.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

#[utoipa::path(
    post,
    path = "/get_latest_text_chunks",
    params(
        ("session_id" = String, Query, description = "Session id"),
        ("language" = String, Query, description = "Language store to read"),
    ),
    request_body = GetLatestTextChunksBody,
    responses((status = 200, description = "Chunks newer than the known versions", body = GetLatestTextChunksResponse)),
    tag = "dispatch",
)]
pub async fn get_latest_text_chunks(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
    Json(body): Json<GetLatestTextChunksBody>,
) -> Result<Json<GetLatestTextChunksResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;
    let known = parse_known_versions(body.versions)?;

    let dispatcher = state.lock().expect("dispatcher lock poisoned");
    let text_chunks = dispatcher
        .get_latest_text_chunks(session_id, language, &known)?
        .into_iter()
        .map(|c| TextChunkWire {
            timestamp: c.chunk_id,
            version: c.version,
            text: c.text,
        })
        .collect();
    let versions = stringify_versions(dispatcher.get_latest_text_chunk_versions(session_id, language)?);

    Ok(Json(GetLatestTextChunksResponse {
        success: true,
        session_id: session_id.to_string(),
        text_chunks,
        versions,
    }))
}

pub async fn get_latest_text_chunk_versions(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
) -> Result<Json<VersionsResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;

    let dispatcher = state.lock().expect("dispatcher lock poisoned");
    let versions = stringify_versions(dispatcher.get_latest_text_chunk_versions(session_id, language)?);
    Ok(Json(VersionsResponse {
        success: true,
        session_id: session_id.to_string(),
        versions,
    }))
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct EditAsrChunkBody {
    pub timestamp: u32,
    pub version: u32,
    pub text: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EditAsrChunkResponse {
    pub success: bool,
    pub session_id: String,
    pub text: String,
    pub timestamp: u32,
    pub version: u32,
}

#[utoipa::path(
    post,
    path = "/edit_asr_chunk",
    params(
        ("session_id" = String, Query, description = "Session id"),
        ("language" = String, Query, description = "Language store to edit"),
    ),
    request_body = EditAsrChunkBody,
    responses((status = 200, description = "Chunk edited", body = EditAsrChunkResponse)),
    tag = "dispatch",
)]
pub async fn edit_asr_chunk(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
    Json(body): Json<EditAsrChunkBody>,
) -> Result<Json<EditAsrChunkResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    let (text, version) =
        dispatcher.edit_asr_chunk(session_id, language, body.timestamp, body.version, &body.text)?;

    Ok(Json(EditAsrChunkResponse {
        success: true,
        session_id: session_id.to_string(),
        text,
        timestamp: body.timestamp,
        version,
    }))
}

#[derive(Deserialize)]
pub struct RateTextChunkBody {
    pub timestamp: u32,
    pub version: u32,
    pub rating_update: i64,
}

#[derive(Serialize)]
pub struct RateTextChunkResponse {
    pub success: bool,
    pub message: String,
}

pub async fn rate_text_chunk(
    State(state): State<AppState>,
    Query(query): Query<LanguageQuery>,
    Json(body): Json<RateTextChunkBody>,
) -> Result<Json<RateTextChunkResponse>, RouteError> {
    let (session_id, language) = require_session_and_language(&query)?;

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.rate_text_chunk(session_id, language, body.timestamp, body.version, body.rating_update)?;

    Ok(Json(RateTextChunkResponse {
        success: true,
        message: format!(
            "Successfully updated rating for {session_id}, language {language}, chunk_id {}, chunk_version {}, rating_update {}",
            body.timestamp, body.version, body.rating_update
        ),
    }))
}
