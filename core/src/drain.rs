use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::buffer::{BufferStore, INGEST_QUEUE, UPDATE_QUEUE};
use crate::domain::errors::PipelineError;
use crate::domain::log::UpdateIntent;
use crate::store::LogStore;

#[derive(Debug, Clone, Copy)]
pub struct DrainConfig {
    pub batch_size: usize,
    pub poll_interval: Duration,
}

impl Default for DrainConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// What one drain cycle did. `full_batch` tells the loop to go straight
/// into the next cycle instead of sleeping the polling interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleOutcome {
    pub popped: usize,
    pub full_batch: bool,
}

impl CycleOutcome {
    fn idle() -> Self {
        Self {
            popped: 0,
            full_batch: false,
        }
    }
}

/// One ingestion drain cycle: pop a bounded batch and write it to the
/// durable store as a single bulk insert.
///
/// Failures stay inside the cycle. A failed bulk insert drops the popped
/// items instead of re-enqueueing them (accepted at-most-once durability)
/// and reports a partial cycle so the loop backs off before retrying.
pub async fn run_ingestion_cycle(
    buffer: &dyn BufferStore,
    store: &dyn LogStore,
    batch_size: usize,
) -> CycleOutcome {
    let items = match buffer.pop_batch(INGEST_QUEUE, batch_size).await {
        Ok(items) => items,
        Err(error) => {
            error!(error = %error, "ingestion drain: pop failed");
            return CycleOutcome::idle();
        }
    };

    if items.is_empty() {
        return CycleOutcome::idle();
    }

    match store.insert_batch(&items).await {
        Ok(inserted) => {
            info!(batch = items.len(), inserted, "ingestion drain: batch written");
            CycleOutcome {
                popped: items.len(),
                full_batch: items.len() == batch_size,
            }
        }
        Err(error) => {
            error!(
                error = %error,
                dropped = items.len(),
                "ingestion drain: bulk insert failed, batch dropped"
            );
            CycleOutcome {
                popped: items.len(),
                full_batch: false,
            }
        }
    }
}

/// One update drain cycle: pop a bounded batch of intents and apply each
/// one individually. Intents target different rows, so there is no single
/// bulk statement here; one bad or failing intent is logged and the rest of
/// the batch proceeds.
pub async fn run_update_cycle(
    buffer: &dyn BufferStore,
    store: &dyn LogStore,
    batch_size: usize,
) -> CycleOutcome {
    let items = match buffer.pop_batch(UPDATE_QUEUE, batch_size).await {
        Ok(items) => items,
        Err(error) => {
            error!(error = %error, "update drain: pop failed");
            return CycleOutcome::idle();
        }
    };

    if items.is_empty() {
        return CycleOutcome::idle();
    }

    let mut applied = 0usize;
    for raw in &items {
        let intent = match serde_json::from_str::<UpdateIntent>(raw) {
            Ok(intent) => intent,
            Err(error) => {
                warn!(error = %error, item = raw.as_str(), "update drain: malformed intent skipped");
                continue;
            }
        };

        match store.apply_rewrite(intent.id).await {
            Ok(true) => applied += 1,
            Ok(false) => {
                warn!(id = intent.id, "update drain: no row for queued intent");
            }
            Err(error) => {
                error!(error = %error, id = intent.id, "update drain: rewrite failed");
            }
        }
    }

    info!(batch = items.len(), applied, "update drain: batch processed");
    CycleOutcome {
        popped: items.len(),
        full_batch: items.len() == batch_size,
    }
}

/// Handle to a spawned drain loop. Dropping it aborts the task; [`stop`]
/// shuts it down cleanly and waits for the loop to exit.
///
/// [`stop`]: DrainWorker::stop
pub struct DrainWorker {
    name: &'static str,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl DrainWorker {
    pub async fn stop(mut self) -> Result<(), PipelineError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }

        if let Some(join_handle) = self.join_handle.take() {
            join_handle
                .await
                .map_err(|error| PipelineError::internal(format!("{} join: {error}", self.name)))?;
        }

        Ok(())
    }
}

impl Drop for DrainWorker {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

/// Spawn the sole consumer of the ingestion queue. Full batch: loop again
/// immediately. Partial or empty batch, or a failed bulk write: sleep the
/// polling interval. The stop signal is observed between cycles and during
/// the sleep.
pub fn spawn_ingestion_drain(
    buffer: Arc<dyn BufferStore>,
    store: Arc<dyn LogStore>,
    config: DrainConfig,
) -> DrainWorker {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        info!(batch_size = config.batch_size, "ingestion drain worker started");
        loop {
            let outcome =
                run_ingestion_cycle(buffer.as_ref(), store.as_ref(), config.batch_size).await;

            if outcome.full_batch {
                match stop_rx.try_recv() {
                    Err(oneshot::error::TryRecvError::Empty) => continue,
                    _ => break,
                }
            }

            tokio::select! {
                _ = &mut stop_rx => break,
                _ = sleep(config.poll_interval) => {}
            }
        }
        info!("ingestion drain worker stopped");
    });

    DrainWorker {
        name: "ingestion drain",
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}

/// Spawn the sole consumer of the update queue. Same scheduling shape as
/// the ingestion worker, independent configuration.
pub fn spawn_update_drain(
    buffer: Arc<dyn BufferStore>,
    store: Arc<dyn LogStore>,
    config: DrainConfig,
) -> DrainWorker {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let join_handle = tokio::spawn(async move {
        info!(batch_size = config.batch_size, "update drain worker started");
        loop {
            let outcome =
                run_update_cycle(buffer.as_ref(), store.as_ref(), config.batch_size).await;

            if outcome.full_batch {
                match stop_rx.try_recv() {
                    Err(oneshot::error::TryRecvError::Empty) => continue,
                    _ => break,
                }
            }

            tokio::select! {
                _ = &mut stop_rx => break,
                _ = sleep(config.poll_interval) => {}
            }
        }
        info!("update drain worker stopped");
    });

    DrainWorker {
        name: "update drain",
        stop_tx: Some(stop_tx),
        join_handle: Some(join_handle),
    }
}
