use std::sync::Arc;

use crate::buffer::{BufferStore, INGEST_QUEUE, UPDATE_QUEUE, cache_key};
use crate::domain::errors::PipelineError;
use crate::domain::log::{IdRange, TrafficLog, UpdateIntent};
use crate::domain::transform::apply_rewrite;

/// Foreground side of the write-behind pipeline: ingest, random update and
/// random read. None of these ever touch the durable store; that is the
/// drain workers' job.
#[derive(Clone)]
pub struct LogPipeline {
    buffer: Arc<dyn BufferStore>,
    range: IdRange,
}

impl LogPipeline {
    pub fn new(buffer: Arc<dyn BufferStore>, range: IdRange) -> Self {
        Self { buffer, range }
    }

    pub fn range(&self) -> IdRange {
        self.range
    }

    /// Serialize the payload and append it to the ingestion queue. Success
    /// means the buffer acknowledged the append, not that the row is
    /// durable; the record stays invisible to [`read_random`] until a
    /// restart re-preloads the cache.
    ///
    /// [`read_random`]: LogPipeline::read_random
    pub async fn submit_ingestion(&self, payload: &serde_json::Value) -> Result<(), PipelineError> {
        let raw = serde_json::to_string(payload)?;
        self.buffer.append(INGEST_QUEUE, &raw).await
    }

    /// Pick a random id, rewrite its cache entry in place so readers see the
    /// change immediately, and queue an intent for the durable rewrite.
    /// The intent is queued even on a cache miss: the row may exist durably
    /// without having been preloaded.
    pub async fn apply_random_update(&self) -> Result<i64, PipelineError> {
        let id = self.range.sample();
        let key = cache_key(id);

        if let Some(cached) = self.buffer.get(&key).await? {
            self.buffer.set(&key, &apply_rewrite(&cached)).await?;
        }

        let intent = serde_json::to_string(&UpdateIntent { id })?;
        self.buffer.append(UPDATE_QUEUE, &intent).await?;

        Ok(id)
    }

    /// Pick a random id and return its cached snapshot. A miss is a valid
    /// outcome (ids ingested after preload, or the empty-table sentinel
    /// range) and never falls through to the durable store.
    pub async fn read_random(&self) -> Result<Option<TrafficLog>, PipelineError> {
        let id = self.range.sample();

        match self.buffer.get(&cache_key(id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::in_memory::InMemoryBufferStore;
    use crate::domain::transform::{UPDATE_APPLIED, UPDATE_MARKER};
    use chrono::Utc;

    fn pipeline_with(buffer: Arc<InMemoryBufferStore>, range: IdRange) -> LogPipeline {
        LogPipeline::new(buffer, range)
    }

    async fn cache_log(buffer: &InMemoryBufferStore, id: i64, payload: &str) {
        let row = TrafficLog {
            id,
            payload: payload.to_string(),
            created_at: Utc::now(),
        };
        buffer
            .set(&cache_key(id), &serde_json::to_string(&row).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ingestion_appends_to_the_queue_only() {
        let buffer = Arc::new(InMemoryBufferStore::new());
        let pipeline = pipeline_with(buffer.clone(), IdRange::new(1, 1));

        pipeline
            .submit_ingestion(&serde_json::json!({"kind": "test_load", "n": 1}))
            .await
            .unwrap();

        assert_eq!(buffer.queue_len(INGEST_QUEUE).await, 1);
        assert_eq!(buffer.queue_len(UPDATE_QUEUE).await, 0);
        // No cache entry appears for queued-but-undrained records.
        assert_eq!(buffer.get(&cache_key(1)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn update_rewrites_cache_immediately_and_queues_intent() {
        let buffer = Arc::new(InMemoryBufferStore::new());
        cache_log(&buffer, 3, &format!("hello {UPDATE_MARKER}")).await;
        let pipeline = pipeline_with(buffer.clone(), IdRange::new(3, 3));

        let id = pipeline.apply_random_update().await.unwrap();
        assert_eq!(id, 3);

        // Cache-immediacy: a read right after the update sees the rewrite,
        // before any drain worker has run.
        let read = pipeline.read_random().await.unwrap().unwrap();
        assert_eq!(read.payload, format!("hello {UPDATE_APPLIED}"));

        let intents = buffer.pop_batch(UPDATE_QUEUE, 10).await.unwrap();
        assert_eq!(intents.len(), 1);
        let intent: UpdateIntent = serde_json::from_str(&intents[0]).unwrap();
        assert_eq!(intent, UpdateIntent { id: 3 });
    }

    #[tokio::test]
    async fn update_on_cache_miss_still_queues_intent() {
        let buffer = Arc::new(InMemoryBufferStore::new());
        let pipeline = pipeline_with(buffer.clone(), IdRange::new(8, 8));

        let id = pipeline.apply_random_update().await.unwrap();
        assert_eq!(id, 8);
        assert_eq!(buffer.get(&cache_key(8)).await.unwrap(), None);
        assert_eq!(buffer.queue_len(UPDATE_QUEUE).await, 1);
    }

    #[tokio::test]
    async fn read_miss_is_an_explicit_none() {
        let buffer = Arc::new(InMemoryBufferStore::new());
        let pipeline = pipeline_with(buffer, IdRange::new(1, 1));

        assert_eq!(pipeline.read_random().await.unwrap(), None);
    }

    #[tokio::test]
    async fn repeated_updates_converge() {
        let buffer = Arc::new(InMemoryBufferStore::new());
        cache_log(&buffer, 5, UPDATE_MARKER).await;
        let pipeline = pipeline_with(buffer, IdRange::new(5, 5));

        pipeline.apply_random_update().await.unwrap();
        let once = pipeline.read_random().await.unwrap().unwrap();
        pipeline.apply_random_update().await.unwrap();
        let twice = pipeline.read_random().await.unwrap().unwrap();

        assert_eq!(once.payload, twice.payload);
    }
}
