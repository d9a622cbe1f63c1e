//! Worker-pool resource for bounded concurrent execution.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded pool of execution environments.
///
/// An explicit resource object handed to the scheduler at construction.
/// A permit is held for the duration of one instance's full step sequence
/// and released for reuse by the next queued instance.
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl WorkerPool {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Acquire an execution slot, waiting until one frees up.
    pub async fn acquire(&self) -> WorkerPermit {
        // The semaphore is never closed, so acquire cannot fail
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .expect("worker pool semaphore closed");
        WorkerPermit { _permit: permit }
    }
}

/// Slot held for one job instance's execution.
pub struct WorkerPermit {
    _permit: OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capacity_is_enforced() {
        let pool = WorkerPool::new(2);

        let first = pool.acquire().await;
        let _second = pool.acquire().await;
        assert_eq!(pool.available(), 0);

        drop(first);
        assert_eq!(pool.available(), 1);

        let _third = pool.acquire().await;
        assert_eq!(pool.available(), 0);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.capacity(), 1);
        let _permit = pool.acquire().await;
    }
}
