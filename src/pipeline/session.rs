//! In-memory sessions
//!
//! A session holds the keyed stage outputs of one pipeline run plus a trace
//! of what each stage could see when it started.

use crate::agent::output::StageValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Where a run currently is
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PipelineState {
    Pending,
    Running { stage_index: usize },
    Complete,
    Failed { stage_index: usize, error: String },
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed { .. })
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::Pending => write!(f, "pending"),
            PipelineState::Running { stage_index } => write!(f, "running({stage_index})"),
            PipelineState::Complete => write!(f, "complete"),
            PipelineState::Failed { stage_index, .. } => write!(f, "failed({stage_index})"),
        }
    }
}

/// Per-stage record of the session keys visible at stage start
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTrace {
    pub stage: String,
    pub keys_at_start: Vec<String>,
    pub output_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub app_name: String,
    pub user_id: String,
    pub keyed_outputs: BTreeMap<String, StageValue>,
    pub trace: Vec<StageTrace>,
    pub state: PipelineState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(app_name: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            app_name: app_name.into(),
            user_id: user_id.into(),
            keyed_outputs: BTreeMap::new(),
            trace: Vec::new(),
            state: PipelineState::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&StageValue> {
        self.keyed_outputs.get(key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.keyed_outputs.keys().cloned().collect()
    }
}

/// Session store shared between a runner and its callers
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and store a fresh session
    pub async fn create(&self, app_name: &str, user_id: &str) -> Session {
        let session = Session::new(app_name, user_id);
        self.sessions
            .write()
            .await
            .insert(session.id, session.clone());
        session
    }

    pub async fn get(&self, id: Uuid) -> Option<Session> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Insert or replace a session
    pub async fn save(&self, session: Session) {
        self.sessions.write().await.insert(session.id, session);
    }

    /// Sessions for one user, oldest first
    pub async fn list_for_user(&self, app_name: &str, user_id: &str) -> Vec<Session> {
        let mut sessions: Vec<Session> = self
            .sessions
            .read()
            .await
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        sessions
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
