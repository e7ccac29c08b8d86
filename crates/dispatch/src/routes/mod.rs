pub mod audio;
pub mod liveness;
pub mod offload;
pub mod rules;
pub mod session;
pub mod text;

use std::sync::Arc;
use std::sync::Mutex;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::dispatcher::Dispatcher;

pub type AppState = Arc<Mutex<Dispatcher>>;

#[derive(OpenApi)]
#[openapi(
    paths(
        session::create_session,
        session::end_session,
        session::get_active_sessions,
        text::get_latest_text_chunks,
        text::edit_asr_chunk,
    ),
    tags((name = "dispatch", description = "Session lifecycle, audio ingest, and worker queues")),
)]
pub struct ApiDoc;

pub fn router(dispatcher: Dispatcher) -> Router {
    let state: AppState = Arc::new(Mutex::new(dispatcher));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
        let path = request.uri().path();
        if path == "/" {
            tracing::trace_span!("liveness")
        } else {
            tracing::info_span!("http_request", method = %request.method(), path)
        }
    });

    Router::new()
        .route("/", get(liveness::handler))
        .route("/create_session", get(session::create_session))
        .route("/end_session", get(session::end_session))
        .route("/get_active_sessions", get(session::get_active_sessions))
        .route("/switch_source_language", post(session::switch_source_language))
        .route(
            "/switch_transcript_language",
            post(session::switch_transcript_language),
        )
        .route("/submit_audio_chunk", post(audio::submit_audio_chunk))
        .route("/submit_audio_file", post(audio::submit_audio_file))
        .route("/get_latest_text_chunks", post(text::get_latest_text_chunks))
        .route(
            "/get_latest_text_chunk_versions",
            get(text::get_latest_text_chunk_versions),
        )
        .route("/edit_asr_chunk", post(text::edit_asr_chunk))
        .route("/rate_text_chunk", post(text::rate_text_chunk))
        .route("/submit_correction_rules", post(rules::submit_correction_rules))
        .route("/get_correction_rules", get(rules::get_correction_rules))
        .route(
            "/offload_ASR",
            get(offload::pull_transcribe).post(offload::post_transcribe),
        )
        .route(
            "/offload_translation",
            get(offload::pull_translate).post(offload::post_translate),
        )
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()).layer(trace))
        .with_state(state)
}
