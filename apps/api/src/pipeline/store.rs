//! Session state store — pluggable, trait-based storage of finished run states.
//!
//! Default: `InMemoryStateStore` (process-local, lost on restart), bounded by
//! a record capacity and a time-to-live. The oldest records go first.
//! `AppState` holds an `Arc<dyn StateStore>` so a durable backend can be
//! swapped in without touching pipeline or handler code.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::pipeline::state::PipelineState;

pub const DEFAULT_SESSION_CAPACITY: usize = 1000;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    pub session_id: Uuid,
    pub state: PipelineState,
    pub saved_at: DateTime<Utc>,
}

#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, session_id: Uuid) -> Option<SessionRecord>;

    async fn put(&self, session_id: Uuid, state: PipelineState);
}

#[derive(Default)]
struct Sessions {
    records: HashMap<Uuid, SessionRecord>,
    /// Insertion order, oldest at the front.
    order: VecDeque<Uuid>,
}

pub struct InMemoryStateStore {
    sessions: RwLock<Sessions>,
    capacity: usize,
    ttl: chrono::Duration,
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY, DEFAULT_SESSION_TTL)
    }
}

impl InMemoryStateStore {
    /// `capacity` is clamped to at least one record.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(Sessions::default()),
            capacity: capacity.max(1),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.records.len()
    }

    fn is_expired(&self, record: &SessionRecord, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(record.saved_at) >= self.ttl
    }

    async fn insert(&self, record: SessionRecord) {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let session_id = record.session_id;

        if sessions.records.insert(session_id, record).is_some() {
            sessions.order.retain(|id| *id != session_id);
        }
        sessions.order.push_back(session_id);

        while let Some(oldest) = sessions.order.front().copied() {
            let expired = sessions
                .records
                .get(&oldest)
                .map_or(true, |r| self.is_expired(r, now));
            if !expired && sessions.records.len() <= self.capacity {
                break;
            }
            sessions.order.pop_front();
            sessions.records.remove(&oldest);
            debug!("Evicted session {oldest}");
        }
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, session_id: Uuid) -> Option<SessionRecord> {
        let sessions = self.sessions.read().await;
        sessions
            .records
            .get(&session_id)
            .filter(|record| !self.is_expired(record, Utc::now()))
            .cloned()
    }

    async fn put(&self, session_id: Uuid, state: PipelineState) {
        self.insert(SessionRecord {
            session_id,
            state,
            saved_at: Utc::now(),
        })
        .await;
    }
}
