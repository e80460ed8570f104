//! In-memory chat transcripts, one per session.
//!
//! Nothing is persisted; transcripts are lost on restart. Each transcript is
//! capped at `max_messages`, oldest turns dropped first. At most
//! `max_sessions` transcripts are held; creating one more evicts the session
//! that was appended to least recently.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::services::metrics::CoreMetrics;
use crate::services::pipeline::{LocationSource, PipelineOutcome};

/// Default cap on messages kept per session.
pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Default cap on sessions held at once.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// What the assistant answered for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnResult {
    Ok {
        location: String,
        location_source: LocationSource,
        metrics: CoreMetrics,
        raw: Value,
    },
    Error {
        location: String,
        location_source: LocationSource,
        error: String,
    },
}

impl From<PipelineOutcome> for TurnResult {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::WeatherResolved {
                location,
                source,
                metrics,
                payload,
            } => TurnResult::Ok {
                location,
                location_source: source,
                metrics,
                raw: payload.into_value(),
            },
            PipelineOutcome::Failed {
                location,
                source,
                error,
            } => TurnResult::Error {
                location,
                location_source: source,
                error,
            },
        }
    }
}

/// One turn in a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChatMessage {
    pub role: Role,
    pub at: DateTime<Utc>,
    /// The user's query text. Null for assistant turns.
    pub content: Option<String>,
    /// The assistant's answer. Null for user turns.
    #[schema(value_type = Option<Object>)]
    pub result: Option<TurnResult>,
}

impl ChatMessage {
    pub fn user(query: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            at: Utc::now(),
            content: Some(query.into()),
            result: None,
        }
    }

    pub fn assistant(result: TurnResult) -> Self {
        Self {
            role: Role::Assistant,
            at: Utc::now(),
            content: None,
            result: Some(result),
        }
    }
}

#[derive(Debug, Default)]
struct Session {
    messages: Vec<ChatMessage>,
    /// Store-wide append counter at the last append; lowest is evicted first.
    last_touched: u64,
}

#[derive(Debug, Default)]
struct Sessions {
    by_id: HashMap<Uuid, Session>,
    clock: u64,
}

/// Shared transcript store handle.
#[derive(Debug, Clone)]
pub struct ChatStore {
    sessions: Arc<RwLock<Sessions>>,
    max_messages: usize,
    max_sessions: usize,
}

impl Default for ChatStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGES, DEFAULT_MAX_SESSIONS)
    }
}

impl ChatStore {
    pub fn new(max_messages: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Sessions::default())),
            max_messages: max_messages.max(1),
            max_sessions: max_sessions.max(1),
        }
    }

    /// Append messages to a session, creating it if needed.
    pub async fn append(&self, session: Uuid, messages: impl IntoIterator<Item = ChatMessage>) {
        let mut sessions = self.sessions.write().await;

        if !sessions.by_id.contains_key(&session) && sessions.by_id.len() >= self.max_sessions {
            let oldest = sessions
                .by_id
                .iter()
                .min_by_key(|(_, s)| s.last_touched)
                .map(|(id, _)| *id);
            if let Some(id) = oldest {
                tracing::debug!("Session limit reached, evicting session {}", id);
                sessions.by_id.remove(&id);
            }
        }

        sessions.clock += 1;
        let now = sessions.clock;
        let entry = sessions.by_id.entry(session).or_default();
        entry.last_touched = now;
        entry.messages.extend(messages);
        if entry.messages.len() > self.max_messages {
            let excess = entry.messages.len() - self.max_messages;
            entry.messages.drain(..excess);
        }
    }

    /// Number of sessions currently held.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.by_id.len()
    }

    /// Snapshot of a session's transcript, `None` for unknown sessions.
    pub async fn history(&self, session: Uuid) -> Option<Vec<ChatMessage>> {
        self.sessions
            .read()
            .await
            .by_id
            .get(&session)
            .map(|s| s.messages.clone())
    }

    /// Drop a session's transcript. Returns whether it existed.
    pub async fn clear(&self, session: Uuid) -> bool {
        self.sessions.write().await.by_id.remove(&session).is_some()
    }
}
