use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status ("ok" when a weather key is configured, "degraded" otherwise)
    pub status: String,
    /// API version
    pub version: String,
    /// Whether a WeatherAPI.com key is configured
    pub weather_api: bool,
    /// Whether model-based location extraction is enabled
    pub location_extraction: bool,
    /// Chat sessions currently held in memory
    pub active_sessions: usize,
}

/// Health check endpoint.
///
/// Does not call either upstream. Returns "degraded" (still 200) when no
/// weather key is set, since every lookup would then fail.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if state.weather_configured {
            "ok".to_string()
        } else {
            "degraded".to_string()
        },
        version: env!("CARGO_PKG_VERSION").to_string(),
        weather_api: state.weather_configured,
        location_extraction: state.llm_configured,
        active_sessions: state.chats.session_count().await,
    })
}
