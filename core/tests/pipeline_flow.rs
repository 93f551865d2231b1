use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::json;
use traffic_log_core::buffer::in_memory::InMemoryBufferStore;
use traffic_log_core::buffer::{BufferStore, UPDATE_QUEUE, cache_key};
use traffic_log_core::domain::log::UpdateIntent;
use traffic_log_core::drain::{run_ingestion_cycle, run_update_cycle};
use traffic_log_core::pipeline::LogPipeline;
use traffic_log_core::preload::preload_cache;
use traffic_log_core::store::LogStore;
use traffic_log_core::store::in_memory::InMemoryLogStore;
use traffic_log_core::{IdRange, PipelineError, TrafficLog};

/// Store wrapper that counts bulk-insert statements, to pin down the
/// one-batched-insert-per-cycle behavior.
struct CountingStore {
    inner: Arc<InMemoryLogStore>,
    insert_batches: AtomicUsize,
}

impl CountingStore {
    fn new(inner: Arc<InMemoryLogStore>) -> Self {
        Self {
            inner,
            insert_batches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LogStore for CountingStore {
    async fn fetch_all(&self) -> Result<Vec<TrafficLog>, PipelineError> {
        self.inner.fetch_all().await
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<TrafficLog>, PipelineError> {
        self.inner.fetch_by_id(id).await
    }

    async fn insert_one(&self, payload: &str) -> Result<TrafficLog, PipelineError> {
        self.inner.insert_one(payload).await
    }

    async fn insert_batch(&self, payloads: &[String]) -> Result<u64, PipelineError> {
        self.insert_batches.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_batch(payloads).await
    }

    async fn apply_rewrite(&self, id: i64) -> Result<bool, PipelineError> {
        self.inner.apply_rewrite(id).await
    }

    async fn id_range(&self) -> Result<Option<(i64, i64)>, PipelineError> {
        self.inner.id_range().await
    }
}

#[tokio::test]
async fn ingestion_flow_preload_submit_drain() {
    let rows = Arc::new(InMemoryLogStore::new());
    rows.seed(&["r1", "r2", "r3", "r4", "r5"]).await;
    let store = CountingStore::new(rows.clone());
    let buffer = Arc::new(InMemoryBufferStore::new());

    let range = preload_cache(&store, buffer.as_ref()).await.unwrap();
    assert_eq!(range, IdRange::new(1, 5));

    let pipeline = LogPipeline::new(buffer.clone(), range);
    for n in 0..3 {
        pipeline
            .submit_ingestion(&json!({"kind": "test_load", "n": n}))
            .await
            .unwrap();
    }

    // Nothing is durable before the drain worker runs.
    assert_eq!(rows.row_count().await, 5);

    let outcome = run_ingestion_cycle(buffer.as_ref(), &store, 100).await;
    assert_eq!(outcome.popped, 3);
    assert!(!outcome.full_batch);

    // All three landed in one bulk statement.
    assert_eq!(rows.row_count().await, 8);
    assert_eq!(store.insert_batches.load(Ordering::SeqCst), 1);

    // The range snapshot does not move for rows ingested after preload, and
    // the new rows stay invisible to the read path until a re-preload.
    assert_eq!(pipeline.range(), IdRange::new(1, 5));
    assert_eq!(buffer.get(&cache_key(6)).await.unwrap(), None);
}

#[tokio::test]
async fn update_flow_cache_then_durable() {
    let store = Arc::new(InMemoryLogStore::new());
    store
        .seed(&["r1", "r2", "a test_load marker", "r4", "r5"])
        .await;
    let buffer = Arc::new(InMemoryBufferStore::new());

    let range = preload_cache(store.as_ref(), buffer.as_ref()).await.unwrap();
    assert_eq!(range, IdRange::new(1, 5));

    // Pin the sampled id so the scenario is deterministic.
    let pipeline = LogPipeline::new(buffer.clone(), IdRange::new(3, 3));
    let id = pipeline.apply_random_update().await.unwrap();
    assert_eq!(id, 3);

    // The cache is rewritten synchronously, the durable row is not yet.
    let cached = pipeline.read_random().await.unwrap().unwrap();
    assert_eq!(cached.payload, "a test_done marker");
    let durable = store.fetch_by_id(3).await.unwrap().unwrap();
    assert_eq!(durable.payload, "a test_load marker");

    // Exactly one intent was queued for the worker.
    let queued = queued_update_intents(&buffer).await;
    assert_eq!(queued, vec![UpdateIntent { id: 3 }]);

    let outcome = run_update_cycle(buffer.as_ref(), store.as_ref(), 100).await;
    assert_eq!(outcome.popped, 1);

    let durable = store.fetch_by_id(3).await.unwrap().unwrap();
    assert_eq!(durable.payload, "a test_done marker");
}

#[tokio::test]
async fn sustained_ingestion_drains_across_cycles() {
    let store = Arc::new(InMemoryLogStore::new());
    let buffer = Arc::new(InMemoryBufferStore::new());
    let pipeline = LogPipeline::new(buffer.clone(), IdRange::new(1, 1));

    for n in 0..250 {
        pipeline.submit_ingestion(&json!({"n": n})).await.unwrap();
    }

    let first = run_ingestion_cycle(buffer.as_ref(), store.as_ref(), 100).await;
    let second = run_ingestion_cycle(buffer.as_ref(), store.as_ref(), 100).await;
    let third = run_ingestion_cycle(buffer.as_ref(), store.as_ref(), 100).await;

    assert!(first.full_batch);
    assert!(second.full_batch);
    assert_eq!(third.popped, 50);
    assert!(!third.full_batch);

    // No worker failures: every accepted submission became a durable row,
    // in submission order.
    assert_eq!(store.row_count().await, 250);
    let rows = store.fetch_all().await.unwrap();
    assert_eq!(rows[0].payload, "{\"n\":0}");
    assert_eq!(rows[249].payload, "{\"n\":249}");
}

/// Drain the update queue to inspect it, then restore it untouched.
async fn queued_update_intents(buffer: &InMemoryBufferStore) -> Vec<UpdateIntent> {
    let items = buffer.pop_batch(UPDATE_QUEUE, usize::MAX).await.unwrap();
    for raw in &items {
        buffer.append(UPDATE_QUEUE, raw).await.unwrap();
    }
    items
        .iter()
        .map(|raw| serde_json::from_str(raw).unwrap())
        .collect()
}
