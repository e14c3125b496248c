pub mod error;
pub mod routes;
pub mod state;
pub mod ws;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
};
use state::AppState;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::warn;

/// Uploads are whole media files.
pub const MAX_UPLOAD_BYTES: usize = 1 << 30;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allowed_origins(&state.settings.app.cors_origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/config", get(routes::system::config))
        .route("/health", get(routes::system::health))
        .route("/benchmark", get(routes::system::benchmark))
        .route("/transcribe", post(routes::transcription::transcribe))
        .route("/transcribe-batch", post(routes::transcription::transcribe_batch))
        .route("/diarize", post(routes::diarization::diarize))
        .route(
            "/transcribe-diarized",
            post(routes::diarization::transcribe_diarized),
        )
        .route(
            "/ollama/translate-srt",
            post(routes::translation::translate_srt),
        )
        .route(
            "/ollama/translate-text",
            post(routes::translation::translate_text),
        );

    let mut router = Router::new()
        .nest("/api", api)
        .route("/health", get(health_check))
        .route("/ws/logs", get(ws::handler::ws_upgrade));

    // Built frontend, served for any path the API doesn't claim.
    if let Some(dir) = &state.settings.app.static_dir {
        router = router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return AllowOrigin::from(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %o, %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    AllowOrigin::list(parsed)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
