//! JSON API endpoints.
//!
//! - POST /api/v1/query
//! - GET /api/v1/weather?location=...
//! - GET /api/v1/sessions/:session_id/messages
//! - DELETE /api/v1/sessions/:session_id

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::errors::{AppError, ErrorResponse};
use crate::routes::AppState;
use crate::services::chat::{ChatMessage, TurnResult};
use crate::services::metrics::{project, CoreMetrics};
use crate::services::pipeline::{LocationSource, PipelineOutcome};
use crate::services::weatherapi::error_result;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct QueryRequest {
    /// Free-text question, e.g. "What's the weather in Lahore right now?"
    pub query: String,
    /// Existing session to append to; a new one is created when omitted
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct WeatherLookupQuery {
    /// Location passed to the provider as-is (city, "lat,lon", postcode, ...)
    pub location: String,
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Outcome of one query through the pipeline.
///
/// On success `metrics` and `raw` are set and `error` is null. On a fetch
/// failure `error` carries the provider message and `metrics` is empty.
#[derive(Debug, Serialize, ToSchema)]
pub struct QueryResponse {
    /// Session the turns were recorded in
    pub session_id: Uuid,
    /// Location the weather was fetched for
    pub location: String,
    /// Whether the location came from the query or the configured default
    pub location_source: LocationSource,
    /// "ok" or "error"
    pub status: String,
    /// Flat display fields; all null on error
    #[schema(value_type = Object)]
    pub metrics: CoreMetrics,
    /// Raw provider payload on success, `{"error": "..."}` on failure
    #[schema(value_type = Object)]
    pub raw: Value,
    /// Fetch error message, null on success
    pub error: Option<String>,
}

impl QueryResponse {
    fn from_outcome(session_id: Uuid, outcome: &PipelineOutcome) -> Self {
        let (status, metrics, raw, error) = match outcome {
            PipelineOutcome::WeatherResolved {
                metrics, payload, ..
            } => ("ok", metrics.clone(), payload.as_value().clone(), None),
            PipelineOutcome::Failed { error, .. } => (
                "error",
                CoreMetrics::default(),
                error_result(error),
                Some(error.clone()),
            ),
        };

        Self {
            session_id,
            location: outcome.location().to_string(),
            location_source: outcome.source(),
            status: status.to_string(),
            metrics,
            raw,
            error,
        }
    }
}

/// Direct lookup result (no extraction).
#[derive(Debug, Serialize, ToSchema)]
pub struct WeatherLookupResponse {
    pub location: String,
    #[schema(value_type = Object)]
    pub metrics: CoreMetrics,
    #[schema(value_type = Object)]
    pub raw: Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionHistoryResponse {
    pub session_id: Uuid,
    pub messages: Vec<ChatMessage>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Run a natural-language query through the pipeline.
///
/// Extracts a location (falling back to the configured default), fetches
/// current weather, and records both turns in the session transcript.
/// A weather fetch failure is reported in the body with status "error",
/// not as an HTTP error.
#[utoipa::path(
    post,
    path = "/api/v1/query",
    tag = "Weather",
    request_body = QueryRequest,
    responses(
        (status = 200, description = "Pipeline outcome", body = QueryResponse),
    )
)]
pub async fn post_query(
    State(state): State<AppState>,
    Json(req): Json<QueryRequest>,
) -> Json<QueryResponse> {
    let session_id = req.session_id.unwrap_or_else(Uuid::new_v4);
    let response = run_and_record(&state, session_id, &req.query).await;
    Json(response)
}

/// Shared by the JSON API and the dashboard form.
pub(crate) async fn run_and_record(state: &AppState, session_id: Uuid, query: &str) -> QueryResponse {
    let outcome = state.pipeline.run(query).await;
    let response = QueryResponse::from_outcome(session_id, &outcome);

    state
        .chats
        .append(
            session_id,
            [
                ChatMessage::user(query),
                ChatMessage::assistant(TurnResult::from(outcome)),
            ],
        )
        .await;

    response
}

/// Fetch current weather for an explicit location, skipping extraction.
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    tag = "Weather",
    params(WeatherLookupQuery),
    responses(
        (status = 200, description = "Current weather", body = WeatherLookupResponse),
        (status = 400, description = "Blank location", body = ErrorResponse),
        (status = 502, description = "Weather provider error", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<WeatherLookupQuery>,
) -> Result<Json<WeatherLookupResponse>, AppError> {
    let location = params.location.trim();
    if location.is_empty() {
        return Err(AppError::BadRequest("location must not be empty".to_string()));
    }

    let payload = state.weather.fetch(location).await?;
    let metrics = project(payload.as_value());

    Ok(Json(WeatherLookupResponse {
        location: location.to_string(),
        metrics,
        raw: payload.into_value(),
    }))
}

/// Get a session's transcript.
#[utoipa::path(
    get,
    path = "/api/v1/sessions/{session_id}/messages",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Transcript, oldest first", body = SessionHistoryResponse),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn get_session_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionHistoryResponse>, AppError> {
    let messages = state
        .chats
        .history(session_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {} not found", session_id)))?;

    Ok(Json(SessionHistoryResponse {
        session_id,
        messages,
    }))
}

/// Delete a session's transcript.
#[utoipa::path(
    delete,
    path = "/api/v1/sessions/{session_id}",
    tag = "Sessions",
    params(("session_id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 204, description = "Transcript deleted"),
        (status = 404, description = "Unknown session", body = ErrorResponse),
    )
)]
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.chats.clear(session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {} not found", session_id)))
    }
}
