use crate::domain::audio::StoreKind;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Bounded worker pool for one pipeline stage
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    capacity: usize,
    semaphore: Arc<Semaphore>,
}

impl WorkerPool {
    /// A capacity of zero is raised to one
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            name,
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run `task` once a slot is free.
    ///
    /// Returns `None` without starting the task if `cancel` fires first.
    /// A task that has started always runs to completion.
    pub async fn run<F>(&self, cancel: &CancellationToken, task: F) -> Option<F::Output>
    where
        F: Future,
    {
        if cancel.is_cancelled() {
            return None;
        }

        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(pool = self.name, "Cancelled while waiting for a worker slot");
                return None;
            }
            permit = self.semaphore.acquire() => permit.ok()?,
        };

        let output = task.await;
        drop(permit);
        Some(output)
    }
}

/// One independently sized pool per stage
#[derive(Debug, Clone)]
pub struct StagePools {
    pub check: WorkerPool,
    pub generation: WorkerPool,
    pub upload_primary: WorkerPool,
    pub upload_mirror: WorkerPool,
}

impl StagePools {
    pub fn new(check: usize, generation: usize, upload_primary: usize, upload_mirror: usize) -> Self {
        Self {
            check: WorkerPool::new("check", check),
            generation: WorkerPool::new("generation", generation),
            upload_primary: WorkerPool::new("upload_primary", upload_primary),
            upload_mirror: WorkerPool::new("upload_mirror", upload_mirror),
        }
    }

    /// Every stage limited to one operation at a time
    pub fn sequential() -> Self {
        Self::new(1, 1, 1, 1)
    }

    pub fn upload(&self, store: StoreKind) -> &WorkerPool {
        match store {
            StoreKind::Primary => &self.upload_primary,
            StoreKind::Mirror => &self.upload_mirror,
        }
    }
}
