use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;

use super::AppState;

#[derive(Deserialize)]
pub struct SessionIdQuery {
    pub session_id: Option<String>,
}

/// Shared by every route that also needs a `language` query parameter.
#[derive(Deserialize)]
pub struct LanguageQuery {
    pub session_id: Option<String>,
    pub language: Option<String>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Serialize)]
pub struct SessionIdResponse {
    pub success: bool,
    pub session_id: String,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ActiveSessionsResponse {
    pub active_sessions: Vec<String>,
}

#[derive(Deserialize)]
pub struct SwitchLanguageBody {
    pub language: String,
}

pub(crate) fn require_session_id(query: &SessionIdQuery) -> Result<&str, RouteError> {
    match query.session_id.as_deref() {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(RouteError::BadRequest("session_id not provided".into())),
    }
}

pub(crate) fn require_session_and_language(query: &LanguageQuery) -> Result<(&str, &str), RouteError> {
    let session_id = match query.session_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => return Err(RouteError::BadRequest("session_id not provided".into())),
    };
    let language = match query.language.as_deref() {
        Some(lang) if !lang.is_empty() => lang,
        _ => return Err(RouteError::BadRequest("language not provided".into())),
    };
    Ok((session_id, language))
}

/// `GET /create_session?session_id=...` — builds a session with the
/// server's configured default source/transcript/supported languages; a
/// client switches languages afterward via `/switch_*_language`.
#[utoipa::path(
    get,
    path = "/create_session",
    params(("session_id" = String, Query, description = "New session id")),
    responses((status = 200, description = "Session created", body = MessageResponse)),
    tag = "dispatch",
)]
pub async fn create_session(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
) -> Result<Json<MessageResponse>, RouteError> {
    let session_id = require_session_id(&query)?.to_string();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    let (source_lang, transcript_lang, supported_langs) = {
        let config = dispatcher.config();
        (
            config.default_source_lang.clone(),
            config.default_transcript_lang.clone(),
            config.default_supported_langs.clone(),
        )
    };

    match dispatcher.create_session(session_id.clone(), source_lang, transcript_lang, supported_langs) {
        Ok(()) => Ok(Json(MessageResponse {
            success: true,
            message: format!("Successfully created session {session_id}"),
        })),
        Err(err) => Err(err.into()),
    }
}

#[utoipa::path(
    get,
    path = "/end_session",
    params(("session_id" = String, Query, description = "Session to end")),
    responses((status = 200, description = "Session ended", body = MessageResponse)),
    tag = "dispatch",
)]
pub async fn end_session(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
) -> Result<Json<MessageResponse>, RouteError> {
    let session_id = require_session_id(&query)?.to_string();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.end_session(&session_id)?;
    Ok(Json(MessageResponse {
        success: true,
        message: format!("Successfully ended session {session_id}"),
    }))
}

#[utoipa::path(
    get,
    path = "/get_active_sessions",
    responses((status = 200, description = "Active session ids", body = ActiveSessionsResponse)),
    tag = "dispatch",
)]
pub async fn get_active_sessions(State(state): State<AppState>) -> Json<ActiveSessionsResponse> {
    let dispatcher = state.lock().expect("dispatcher lock poisoned");
    Json(ActiveSessionsResponse {
        active_sessions: dispatcher.active_sessions(),
    })
}

pub async fn switch_source_language(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
    Json(body): Json<SwitchLanguageBody>,
) -> Result<Json<SessionIdResponse>, RouteError> {
    let session_id = require_session_id(&query)?.to_string();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.switch_source_language(&session_id, body.language)?;
    Ok(Json(SessionIdResponse { success: true, session_id }))
}

/// Rebuilds the session's tokenizer (and thus its processor) for the new
/// transcript language.
pub async fn switch_transcript_language(
    State(state): State<AppState>,
    Query(query): Query<SessionIdQuery>,
    Json(body): Json<SwitchLanguageBody>,
) -> Result<Json<SessionIdResponse>, RouteError> {
    let session_id = require_session_id(&query)?.to_string();

    let mut dispatcher = state.lock().expect("dispatcher lock poisoned");
    dispatcher.switch_transcript_language(&session_id, body.language)?;
    Ok(Json(SessionIdResponse { success: true, session_id }))
}
