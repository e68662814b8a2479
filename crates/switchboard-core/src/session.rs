//! Session management - one transcript per (application, user, session id)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Result, SwitchboardError};
use crate::types::Turn;

/// Shared handle to a session; the mutex serializes transcript appends
pub type SessionHandle = Arc<Mutex<Session>>;

/// A single conversation with its append-only transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    app_name: String,
    user_id: String,
    id: String,
    state: HashMap<String, Value>,
    transcript: Vec<Turn>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl Session {
    pub fn new(
        app_name: impl Into<String>,
        user_id: impl Into<String>,
        id: impl Into<String>,
        state: HashMap<String, Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            app_name: app_name.into(),
            user_id: user_id.into(),
            id: id.into(),
            state,
            transcript: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> &HashMap<String, Value> {
        &self.state
    }

    /// Every turn ever appended, oldest first
    pub fn transcript(&self) -> &[Turn] {
        &self.transcript
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Append a turn. Turns are never edited or removed once appended.
    pub(crate) fn append(&mut self, turn: Turn) {
        self.last_activity = turn.timestamp;
        self.transcript.push(turn);
        debug!(
            "Session '{}' appended turn (turns: {})",
            self.id,
            self.transcript.len()
        );
    }
}

/// Storage for sessions. Lifecycle (create/delete) belongs to the caller.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session; a fresh UUID is used when `session_id` is `None`
    async fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: HashMap<String, Value>,
    ) -> Result<SessionHandle>;

    async fn get(&self, app_name: &str, user_id: &str, session_id: &str) -> Option<SessionHandle>;

    /// Session ids of one user, sorted
    async fn list(&self, app_name: &str, user_id: &str) -> Vec<String>;

    /// Returns whether a session was removed
    async fn delete(&self, app_name: &str, user_id: &str, session_id: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SessionKey {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionKey {
    fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

/// Process-local session store; everything is lost on exit
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, SessionHandle>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions across all applications and users
    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: HashMap<String, Value>,
    ) -> Result<SessionHandle> {
        let id = session_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let key = SessionKey::new(app_name, user_id, &id);

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&key) {
            return Err(SwitchboardError::SessionExists {
                app_name: key.app_name,
                user_id: key.user_id,
                session_id: key.session_id,
            });
        }

        let handle = Arc::new(Mutex::new(Session::new(app_name, user_id, &id, state)));
        sessions.insert(key, handle.clone());
        info!("Created session '{}' for {}/{}", id, app_name, user_id);
        Ok(handle)
    }

    async fn get(&self, app_name: &str, user_id: &str, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&SessionKey::new(app_name, user_id, session_id))
            .cloned()
    }

    async fn list(&self, app_name: &str, user_id: &str) -> Vec<String> {
        let sessions = self.sessions.read().await;
        let mut ids: Vec<String> = sessions
            .keys()
            .filter(|k| k.app_name == app_name && k.user_id == user_id)
            .map(|k| k.session_id.clone())
            .collect();
        ids.sort();
        ids
    }

    async fn delete(&self, app_name: &str, user_id: &str, session_id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        let removed = sessions
            .remove(&SessionKey::new(app_name, user_id, session_id))
            .is_some();
        if removed {
            info!("Deleted session '{}' for {}/{}", session_id, app_name, user_id);
        }
        removed
    }
}
