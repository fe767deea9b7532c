//! In-memory session store

use super::SessionStore;
use async_trait::async_trait;
use imgdesk_core::{ImgdeskResult, Session};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredSession {
    session: Session,
    last_seen: Instant,
}

/// Session store backed by a process-local map
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, StoredSession>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: &str) -> ImgdeskResult<Option<Session>> {
        let mut sessions = self.sessions.write().await;
        Ok(sessions.get_mut(id).map(|stored| {
            stored.last_seen = Instant::now();
            stored.session.clone()
        }))
    }

    async fn save(&self, id: &str, session: Session) -> ImgdeskResult<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.to_string(),
            StoredSession {
                session,
                last_seen: Instant::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, id: &str) -> ImgdeskResult<()> {
        self.sessions.write().await.remove(id);
        Ok(())
    }

    async fn purge_idle(&self, max_idle: Duration) -> ImgdeskResult<usize> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, stored| stored.last_seen.elapsed() <= max_idle);
        let purged = before - sessions.len();

        if purged > 0 {
            debug!("Purged {} idle sessions", purged);
        }
        Ok(purged)
    }
}
