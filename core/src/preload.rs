use tracing::info;

use crate::buffer::{BufferStore, cache_key};
use crate::domain::errors::PipelineError;
use crate::domain::log::IdRange;
use crate::store::LogStore;

/// One-shot startup preload: copy every durable row into the cache and
/// snapshot the id range the read/update paths will sample from.
///
/// Serving must not start before this returns; a failure here means the
/// process has no primed cache or range and should not come up at all.
pub async fn preload_cache(
    store: &dyn LogStore,
    buffer: &dyn BufferStore,
) -> Result<IdRange, PipelineError> {
    let rows = store.fetch_all().await?;

    let entries = rows
        .iter()
        .map(|row| Ok((cache_key(row.id), serde_json::to_string(row)?)))
        .collect::<Result<Vec<_>, PipelineError>>()?;
    buffer.set_many(&entries).await?;

    // Rows come back ordered by id, so the ends of the slice are the range.
    let range = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => IdRange::new(first.id, last.id),
        _ => IdRange::new(1, 1),
    };

    info!(
        rows = rows.len(),
        min_id = range.min_id,
        max_id = range.max_id,
        "preloaded traffic logs into cache"
    );

    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::in_memory::InMemoryBufferStore;
    use crate::store::in_memory::InMemoryLogStore;

    #[tokio::test]
    async fn preload_populates_cache_and_range() {
        let store = InMemoryLogStore::new();
        store.seed(&["one", "two", "three"]).await;
        let buffer = InMemoryBufferStore::new();

        let range = preload_cache(&store, &buffer).await.unwrap();

        assert_eq!(range, IdRange::new(1, 3));
        for id in 1..=3 {
            let cached = buffer.get(&cache_key(id)).await.unwrap().unwrap();
            let row: crate::TrafficLog = serde_json::from_str(&cached).unwrap();
            assert_eq!(row.id, id);
        }
    }

    #[tokio::test]
    async fn empty_store_defaults_to_sentinel_range() {
        let store = InMemoryLogStore::new();
        let buffer = InMemoryBufferStore::new();

        let range = preload_cache(&store, &buffer).await.unwrap();

        assert_eq!(range, IdRange::new(1, 1));
        assert_eq!(buffer.get(&cache_key(1)).await.unwrap(), None);
    }
}
