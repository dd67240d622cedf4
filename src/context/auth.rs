//! Member sessions issued by the backend and remembered across restarts.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backend::models::{AuthSession, Credentials, User};
use crate::backend::{BackendError, ContentApi};
use crate::db::store::{SessionRecord, Store};

pub struct AuthContext {
    sessions: RwLock<HashMap<String, User>>,
    store: Arc<Store>,
}

impl AuthContext {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            store,
        }
    }

    /// Load persisted sessions. Returns how many were restored.
    pub async fn hydrate(&self) -> Result<usize> {
        let records = self.store.get_all_sessions().await?;
        let mut sessions = self.sessions.write().await;
        for record in records {
            sessions.insert(
                record.token,
                User {
                    id: record.user_id,
                    username: record.username,
                    email: record.email,
                },
            );
        }
        Ok(sessions.len())
    }

    /// Authenticate against the backend and remember the issued session.
    pub async fn login(&self, api: &dyn ContentApi, credentials: &Credentials) -> Result<AuthSession, BackendError> {
        let session = api.login(credentials).await?;

        let record = SessionRecord {
            token: session.token.clone(),
            user_id: session.user.id,
            username: session.user.username.clone(),
            email: session.user.email.clone(),
            created_at: None,
        };
        if let Err(e) = self.store.insert_session(&record).await {
            warn!(error = %e, user_id = session.user.id, "Failed to persist session");
        }

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.user.clone());

        info!(user_id = session.user.id, "Member signed in");
        Ok(session)
    }

    pub async fn session(&self, token: &str) -> Option<User> {
        self.sessions.read().await.get(token).cloned()
    }

    /// Forget a session. Returns whether it was known.
    pub async fn logout(&self, token: &str) -> bool {
        let removed = self.sessions.write().await.remove(token);
        if let Err(e) = self.store.delete_session(token).await {
            warn!(error = %e, "Failed to delete persisted session");
        }
        if let Some(user) = &removed {
            info!(user_id = user.id, "Member signed out");
        }
        removed.is_some()
    }

    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }
}
