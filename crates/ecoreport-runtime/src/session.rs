//! Per-chat session storage.
//!
//! One [`FormSession`] per chat, behind an async mutex so events from the
//! same chat are applied strictly in order. Idle sessions expire after the
//! configured TTL, which doubles as the abandonment cleanup.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tokio::sync::Mutex;

use ecoreport_core::FormSession;

use crate::transport::ChatId;

#[derive(Clone)]
pub struct SessionStore {
    sessions: Cache<i64, Arc<Mutex<FormSession>>>,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        let sessions = Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(idle_ttl)
            .build();
        Self { sessions }
    }

    /// Fetch the session for a chat, creating an idle one on first contact.
    pub async fn get_or_create(&self, chat: ChatId) -> Arc<Mutex<FormSession>> {
        self.sessions
            .get_with(chat.0, async { Arc::new(Mutex::new(FormSession::new())) })
            .await
    }

    /// Drop the session outright, e.g. after a completed submission.
    pub async fn remove(&self, chat: ChatId) {
        self.sessions.invalidate(&chat.0).await;
    }
}
