use async_trait::async_trait;

use crate::domain::errors::PipelineError;
use crate::domain::log::TrafficLog;

pub mod in_memory;
pub mod postgres;

/// Durable store for traffic logs. `insert_batch` and `apply_rewrite` are
/// the write-behind pipeline's side; `insert_one`, `fetch_by_id` and
/// `id_range` exist for the direct-write baseline API.
#[async_trait]
pub trait LogStore: Send + Sync {
    /// Every row, ordered by id ascending.
    async fn fetch_all(&self) -> Result<Vec<TrafficLog>, PipelineError>;

    async fn fetch_by_id(&self, id: i64) -> Result<Option<TrafficLog>, PipelineError>;

    async fn insert_one(&self, payload: &str) -> Result<TrafficLog, PipelineError>;

    /// Insert all payloads as one batched statement. Returns the number of
    /// rows written.
    async fn insert_batch(&self, payloads: &[String]) -> Result<u64, PipelineError>;

    /// Apply the marker rewrite to one row's payload. Returns false when no
    /// row has that id.
    async fn apply_rewrite(&self, id: i64) -> Result<bool, PipelineError>;

    /// `(min, max)` of the id column, `None` for an empty table.
    async fn id_range(&self) -> Result<Option<(i64, i64)>, PipelineError>;
}
