use std::sync::Arc;

use traffic_log_core::store::LogStore;
use traffic_log_core::{IdRange, PipelineError, TrafficLog};

/// Direct synchronous path: every operation is a durable-store round trip.
/// This is the bottleneck the buffered pipeline exists to remove; it stays
/// around as the baseline for load comparisons.
#[derive(Clone)]
pub struct ClassicLogService {
    store: Arc<dyn LogStore>,
    range: IdRange,
}

impl ClassicLogService {
    pub fn new(store: Arc<dyn LogStore>, range: IdRange) -> Self {
        Self { store, range }
    }

    /// Snapshot the id range once at startup, like the buffered preload
    /// does; `(1, 1)` for an empty table.
    pub async fn with_startup_range(store: Arc<dyn LogStore>) -> Result<Self, PipelineError> {
        let range = match store.id_range().await? {
            Some((min_id, max_id)) => IdRange::new(min_id, max_id),
            None => IdRange::new(1, 1),
        };
        Ok(Self::new(store, range))
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    pub async fn ingest(&self, payload: &serde_json::Value) -> Result<TrafficLog, PipelineError> {
        let raw = serde_json::to_string(payload)?;
        self.store.insert_one(&raw).await
    }

    pub async fn update_random(&self) -> Result<i64, PipelineError> {
        let id = self.range.sample();
        self.store.apply_rewrite(id).await?;
        Ok(id)
    }

    pub async fn read_random(&self) -> Result<Option<TrafficLog>, PipelineError> {
        self.store.fetch_by_id(self.range.sample()).await
    }
}
