use chatbridge_client::Backend;
use chatbridge_config::{OnCreateFailure, SessionSettings};
use chatbridge_util::id::local_session_id;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::BridgeError;

/// Key used when a request carries no `user`.
pub const DEFAULT_SESSION_KEY: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub id: String,
    pub key: String,
    pub created_at: DateTime<Utc>,
    /// The backend refused to create a session and `id` was minted locally.
    pub degraded: bool,
}

/// Conversation key to backend session, created at most once per key.
pub struct SessionRegistry {
    backend: Arc<dyn Backend>,
    settings: SessionSettings,
    sessions: DashMap<String, Arc<OnceCell<SessionHandle>>>,
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn Backend>, settings: SessionSettings) -> Self {
        Self {
            backend,
            settings,
            sessions: DashMap::new(),
        }
    }

    pub fn normalize_key(key: Option<&str>) -> &str {
        key.map(str::trim)
            .filter(|k| !k.is_empty())
            .unwrap_or(DEFAULT_SESSION_KEY)
    }

    /// Returns the session for `key`, creating it on first use. Concurrent
    /// first callers share a single creation.
    pub async fn resolve(&self, key: Option<&str>) -> Result<SessionHandle, BridgeError> {
        let key = Self::normalize_key(key);
        // The map guard must not be held across the await below.
        let cell = Arc::clone(&self.sessions.entry(key.to_string()).or_default());
        let handle = cell.get_or_try_init(|| self.create(key)).await?;
        Ok(handle.clone())
    }

    /// Already established session for `key`, if any.
    pub fn get(&self, key: &str) -> Option<SessionHandle> {
        self.sessions.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Drops the mapping. The next `resolve` creates a fresh session.
    pub fn forget(&self, key: &str) -> Option<SessionHandle> {
        self.sessions
            .remove(key)
            .and_then(|(_, cell)| cell.get().cloned())
    }

    pub fn len(&self) -> usize {
        self.sessions.iter().filter(|e| e.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    async fn create(&self, key: &str) -> Result<SessionHandle, BridgeError> {
        match self.backend.create_session(&self.settings.title).await {
            Ok(session) => {
                tracing::info!(key, session_id = %session.id, "created backend session");
                Ok(SessionHandle {
                    created_at: session.created_at().unwrap_or_else(Utc::now),
                    id: session.id,
                    key: key.to_string(),
                    degraded: false,
                })
            }
            Err(error) => match self.settings.on_create_failure {
                OnCreateFailure::Local => {
                    let id = local_session_id();
                    tracing::warn!(
                        %error,
                        key,
                        session_id = %id,
                        "backend session creation failed, continuing with local session id"
                    );
                    Ok(SessionHandle {
                        id,
                        key: key.to_string(),
                        created_at: Utc::now(),
                        degraded: true,
                    })
                }
                OnCreateFailure::Fail => {
                    tracing::warn!(%error, key, "backend session creation failed");
                    Err(BridgeError::BackendUnavailable(format!(
                        "failed to create session: {}",
                        error
                    )))
                }
            },
        }
    }
}
