pub mod dashboard;
pub mod health;
pub mod query;

use axum::routing::{delete, get, post};
use axum::Router;
use std::sync::Arc;

use crate::services::chat::ChatStore;
use crate::services::pipeline::WeatherPipeline;
use crate::services::weatherapi::WeatherSource;

/// Shared application state for all routes.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) pipeline: WeatherPipeline,
    /// Used directly by the extraction-free lookup endpoint.
    pub(crate) weather: Arc<dyn WeatherSource>,
    pub(crate) chats: ChatStore,
    pub(crate) weather_configured: bool,
    pub(crate) llm_configured: bool,
}

/// All application routes. Layers and Swagger UI are added in `main`.
pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/chat", post(dashboard::post_chat))
        .route("/chat/clear", post(dashboard::post_clear))
        .route("/api/v1/health", get(health::health_check))
        .route("/api/v1/query", post(query::post_query))
        .route("/api/v1/weather", get(query::get_weather))
        .route(
            "/api/v1/sessions/:session_id/messages",
            get(query::get_session_messages),
        )
        .route("/api/v1/sessions/:session_id", delete(query::delete_session))
        .with_state(state)
}
