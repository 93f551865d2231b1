use async_trait::async_trait;

use crate::domain::errors::PipelineError;

pub mod in_memory;
pub mod redis;

/// Queue fed by the ingestion path and drained by the ingestion worker.
pub const INGEST_QUEUE: &str = "traffic_queue";

/// Queue fed by the update path and drained by the update worker.
pub const UPDATE_QUEUE: &str = "update_queue";

/// Cache keys share one namespace prefix so they route as a unit when the
/// backing store shards by key (Redis cluster hash tags).
const CACHE_PREFIX: &str = "{logs}";

pub fn cache_key(id: i64) -> String {
    format!("{CACHE_PREFIX}:{id}")
}

/// The queue/cache collaborator: per-key get/set for cache entries plus two
/// named FIFO queues. Appends may come from many concurrent producers; each
/// queue has exactly one consumer, so a single pop never hands the same item
/// to two callers.
#[async_trait]
pub trait BufferStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError>;

    /// Store many entries in one round trip where the backend supports it.
    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), PipelineError> {
        for (key, value) in entries {
            self.set(key, value).await?;
        }
        Ok(())
    }

    /// Append to the tail of a queue.
    async fn append(&self, queue: &str, item: &str) -> Result<(), PipelineError>;

    /// Pop up to `max_count` items from the head of a queue. The result may
    /// be shorter than `max_count` or empty; a short batch means the queue
    /// was exhausted mid-pop and is not an error.
    async fn pop_batch(&self, queue: &str, max_count: usize)
    -> Result<Vec<String>, PipelineError>;
}
