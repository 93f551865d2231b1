use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::errors::PipelineError;
use crate::domain::log::TrafficLog;
use crate::domain::transform::apply_rewrite;
use crate::store::LogStore;

/// In-memory durable store with sequential ids, mirroring the Postgres
/// implementation closely enough for contract and pipeline tests.
pub struct InMemoryLogStore {
    inner: RwLock<Inner>,
}

struct Inner {
    rows: BTreeMap<i64, TrafficLog>,
    next_id: i64,
}

impl Default for InMemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Seed rows with explicit ids, e.g. to reproduce a preexisting table.
    pub async fn seed(&self, payloads: &[&str]) {
        let mut inner = self.inner.write().await;
        for payload in payloads {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.rows.insert(
                id,
                TrafficLog {
                    id,
                    payload: (*payload).to_string(),
                    created_at: Utc::now(),
                },
            );
        }
    }

    pub async fn row_count(&self) -> usize {
        self.inner.read().await.rows.len()
    }
}

#[async_trait]
impl LogStore for InMemoryLogStore {
    async fn fetch_all(&self) -> Result<Vec<TrafficLog>, PipelineError> {
        Ok(self.inner.read().await.rows.values().cloned().collect())
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<TrafficLog>, PipelineError> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn insert_one(&self, payload: &str) -> Result<TrafficLog, PipelineError> {
        let mut inner = self.inner.write().await;
        let id = inner.next_id;
        inner.next_id += 1;

        let row = TrafficLog {
            id,
            payload: payload.to_string(),
            created_at: Utc::now(),
        };
        inner.rows.insert(id, row.clone());
        Ok(row)
    }

    async fn insert_batch(&self, payloads: &[String]) -> Result<u64, PipelineError> {
        let mut inner = self.inner.write().await;
        for payload in payloads {
            let id = inner.next_id;
            inner.next_id += 1;
            inner.rows.insert(
                id,
                TrafficLog {
                    id,
                    payload: payload.clone(),
                    created_at: Utc::now(),
                },
            );
        }
        Ok(payloads.len() as u64)
    }

    async fn apply_rewrite(&self, id: i64) -> Result<bool, PipelineError> {
        let mut inner = self.inner.write().await;
        let Some(row) = inner.rows.get_mut(&id) else {
            return Ok(false);
        };

        row.payload = apply_rewrite(&row.payload);
        Ok(true)
    }

    async fn id_range(&self) -> Result<Option<(i64, i64)>, PipelineError> {
        let inner = self.inner.read().await;
        let min = inner.rows.keys().next().copied();
        let max = inner.rows.keys().next_back().copied();
        Ok(min.zip(max))
    }
}
