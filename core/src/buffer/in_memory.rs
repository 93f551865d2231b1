use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::buffer::BufferStore;
use crate::domain::errors::PipelineError;

/// Process-local buffer store. Useful for tests and single-process setups;
/// the API and worker binaries talk to Redis so the queues survive across
/// processes.
#[derive(Default)]
pub struct InMemoryBufferStore {
    entries: RwLock<HashMap<String, String>>,
    queues: RwLock<HashMap<String, VecDeque<String>>>,
}

impl InMemoryBufferStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of a queue, for assertions in tests.
    pub async fn queue_len(&self, queue: &str) -> usize {
        self.queues
            .read()
            .await
            .get(queue)
            .map(VecDeque::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl BufferStore for InMemoryBufferStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn append(&self, queue: &str, item: &str) -> Result<(), PipelineError> {
        self.queues
            .write()
            .await
            .entry(queue.to_string())
            .or_default()
            .push_back(item.to_string());
        Ok(())
    }

    async fn pop_batch(
        &self,
        queue: &str,
        max_count: usize,
    ) -> Result<Vec<String>, PipelineError> {
        let mut queues = self.queues.write().await;
        let Some(items) = queues.get_mut(queue) else {
            return Ok(Vec::new());
        };

        let take = max_count.min(items.len());
        Ok(items.drain(..take).collect())
    }
}
