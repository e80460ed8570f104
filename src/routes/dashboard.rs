//! Browser-facing chat dashboard.
//!
//! - GET / ?session=UUID
//! - POST /chat (form: query, session)
//! - POST /chat/clear (form: session)
//!
//! Form posts redirect back to `/` (303) so a reload never re-runs a query.

use axum::extract::{Query, State};
use axum::response::{Html, Redirect};
use axum::Form;
use serde::Deserialize;
use uuid::Uuid;

use crate::render;
use crate::routes::query::run_and_record;
use crate::routes::AppState;

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub session: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    pub query: String,
    pub session: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ClearForm {
    pub session: Uuid,
}

fn session_location(session: Uuid) -> String {
    format!("/?session={}", session)
}

pub async fn index(
    State(state): State<AppState>,
    Query(params): Query<DashboardQuery>,
) -> Html<String> {
    let history = match params.session {
        Some(session) => state.chats.history(session).await.unwrap_or_default(),
        None => Vec::new(),
    };
    Html(render::page(params.session, &history))
}

pub async fn post_chat(State(state): State<AppState>, Form(form): Form<ChatForm>) -> Redirect {
    let session = form.session.unwrap_or_else(Uuid::new_v4);
    let query = form.query.trim();

    // Blank submissions are ignored, like an empty chat box.
    if !query.is_empty() {
        run_and_record(&state, session, query).await;
    }

    Redirect::to(&session_location(session))
}

pub async fn post_clear(State(state): State<AppState>, Form(form): Form<ClearForm>) -> Redirect {
    state.chats.clear(form.session).await;
    Redirect::to("/")
}
