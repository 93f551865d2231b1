use std::num::NonZeroUsize;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::buffer::BufferStore;
use crate::domain::errors::PipelineError;

/// Redis-backed buffer store. Cache entries are plain string keys, queues
/// are Redis lists (RPUSH tail / LPOP head).
#[derive(Clone)]
pub struct RedisBufferStore {
    conn: ConnectionManager,
}

impl RedisBufferStore {
    /// Connect and establish a managed connection that reconnects on its
    /// own. Fails fast if the server is unreachable, which is what startup
    /// wants.
    pub async fn connect(url: &str) -> Result<Self, PipelineError> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl BufferStore for RedisBufferStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PipelineError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(map_redis_error)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PipelineError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, value)
            .await
            .map_err(map_redis_error)
    }

    async fn set_many(&self, entries: &[(String, String)]) -> Result<(), PipelineError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut pipeline = redis::pipe();
        for (key, value) in entries {
            pipeline.set(key, value).ignore();
        }

        let mut conn = self.conn.clone();
        pipeline
            .query_async::<()>(&mut conn)
            .await
            .map_err(map_redis_error)
    }

    async fn append(&self, queue: &str, item: &str) -> Result<(), PipelineError> {
        let mut conn = self.conn.clone();
        conn.rpush::<_, _, ()>(queue, item)
            .await
            .map_err(map_redis_error)
    }

    async fn pop_batch(
        &self,
        queue: &str,
        max_count: usize,
    ) -> Result<Vec<String>, PipelineError> {
        let Some(count) = NonZeroUsize::new(max_count) else {
            return Ok(Vec::new());
        };

        // Counted LPOP returns nil for a missing key, which decodes to an
        // empty list.
        let mut conn = self.conn.clone();
        conn.lpop(queue, Some(count)).await.map_err(map_redis_error)
    }
}

fn map_redis_error(error: redis::RedisError) -> PipelineError {
    PipelineError::Buffer(error.to_string())
}
