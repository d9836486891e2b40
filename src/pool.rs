use std::{future::Future, sync::Arc};

use tokio::{
    sync::{AcquireError, Semaphore},
    task::JoinHandle,
};

/// Runs at most `size` submitted futures at a time on the tokio runtime.
///
/// The pool is cheap to clone and meant to be shared by every batch of a run.
#[derive(Clone, Debug)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    /// # Panics
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "worker pool needs at least one worker");

        Self {
            permits: Arc::new(Semaphore::new(size)),
        }
    }

    /// Spawns `fut` once a worker is free and returns its handle.
    ///
    /// Waits while all workers are busy, so submitting a large batch never
    /// spawns more running tasks than the pool has workers.
    pub async fn submit<F>(&self, fut: F) -> Result<JoinHandle<F::Output>, AcquireError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let permit = Arc::clone(&self.permits).acquire_owned().await?;

        Ok(tokio::spawn(async move {
            let out = fut.await;
            drop(permit);
            out
        }))
    }
}
