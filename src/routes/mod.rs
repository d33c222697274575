//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static SPA from `./static` with index fallback
/// - CORS (allow any origin/method/headers) – adjust for production if needed
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    // Static files with SPA fallback
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        // WebSocket
        .route("/ws", get(ws::ws_upgrade))
        // HTTP API
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/challenge", get(http::http_get_challenge))
        .route("/api/v1/challenges", get(http::http_list_challenges))
        .route("/api/v1/challenges/search", get(http::http_search_challenges))
        .route("/api/v1/challenge/random", get(http::http_get_random_challenge))
        .route("/api/v1/challenge/dynamic", get(http::http_get_dynamic_challenge))
        .route("/api/v1/skills", get(http::http_get_skills))
        .route("/api/v1/challenge/start", post(http::http_post_start))
        .route("/api/v1/solution", post(http::http_post_solution))
        .route("/api/v1/answer/dynamic", post(http::http_post_dynamic_answer))
        .route("/api/v1/hint", get(http::http_get_hint))
        .route("/api/v1/complete", post(http::http_post_complete))
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/performance", get(http::http_get_performance))
        .route("/api/v1/report", get(http::http_get_report))
        .route("/api/v1/analysis", post(http::http_post_analysis))
        .route("/api/v1/recommendation", post(http::http_post_recommendation))
        .route("/api/v1/session/clear", post(http::http_post_clear_session))
        // State + CORS + HTTP tracing
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        // Frontend fallback
        .fallback_service(static_service)
}
