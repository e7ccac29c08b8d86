use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::dispatcher::DispatchError;

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<String>,
    message: String,
}

pub(crate) enum RouteError {
    UnknownSession(String),
    UnknownLanguage(String, String),
    BadRequest(String),
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        let (status, session_id, message) = match self {
            Self::UnknownSession(id) => (
                StatusCode::NOT_FOUND,
                Some(id.clone()),
                format!("unknown session: {id}"),
            ),
            Self::UnknownLanguage(id, lang) => (
                StatusCode::NOT_FOUND,
                Some(id.clone()),
                format!("unknown language {lang:?} for session {id}"),
            ),
            Self::BadRequest(m) => (StatusCode::BAD_REQUEST, None, m),
        };

        (
            status,
            Json(ErrorBody {
                success: false,
                session_id,
                message,
            }),
        )
            .into_response()
    }
}

impl From<DispatchError> for RouteError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::UnknownSession(id) => Self::UnknownSession(id),
            DispatchError::UnknownLanguage(id, lang) => Self::UnknownLanguage(id, lang),
            DispatchError::BadRequest(m) => Self::BadRequest(m),
        }
    }
}
