//! In-memory session storage.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Key/value data held by one session.
pub type SessionData = Map<String, Value>;

#[derive(Debug, Clone)]
struct SessionRecord {
    data: SessionData,
    expires_at: Instant,
}

/// A thread-safe, process-local session store.
///
/// Entries expire `max_age` after their last save or touch. Expired entries
/// are dropped when they are next looked up or by the background sweep
/// ([`SessionStore::run_sweeper`]).
/// Nothing survives a restart.
#[derive(Clone, Debug)]
pub struct SessionStore {
    inner: Arc<DashMap<Uuid, SessionRecord>>,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(max_age: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            max_age,
        }
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Fetch a live session's data.
    pub fn load(&self, id: &Uuid) -> Option<SessionData> {
        let now = Instant::now();
        let expired = match self.inner.get(id) {
            Some(record) if record.expires_at > now => return Some(record.data.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            self.inner.remove(id);
            tracing::debug!(session_id = %id, "Session expired");
        }
        None
    }

    pub fn save(&self, id: Uuid, data: SessionData) {
        let record = SessionRecord {
            data,
            expires_at: Instant::now() + self.max_age,
        };
        self.inner.insert(id, record);
    }

    /// Extend a live session's lifetime without rewriting its data.
    pub fn touch(&self, id: &Uuid) {
        if let Some(mut record) = self.inner.get_mut(id) {
            record.expires_at = Instant::now() + self.max_age;
        }
    }

    pub fn destroy(&self, id: &Uuid) {
        self.inner.remove(id);
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, record| record.expires_at > now);
        before - self.inner.len()
    }

    /// Prune expired entries every `period` until `stop` fires.
    pub async fn run_sweeper(self, period: Duration, mut stop: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.prune_expired();
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Expired sessions pruned");
                    }
                }
                _ = stop.recv() => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
