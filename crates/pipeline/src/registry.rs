//! Live-worker registry.
//!
//! Holds a cancellation handle for every spawned stage worker so that an
//! abort can stop them in bulk. The registry does not own the workers'
//! tasks; a sweep requests cancellation and forgets them without joining.

use chrono::{DateTime, Utc};
use fabflow_core::Stage;
use indexmap::IndexMap;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A spawned stage worker as the registry tracks it. Cancelling the
/// handle wakes the worker out of its progress sleep.
#[derive(Debug)]
pub struct WorkerHandle {
    pub id: Uuid,
    pub stage: Stage,
    pub spawned_at: DateTime<Utc>,
    token: CancellationToken,
}

impl WorkerHandle {
    pub fn new(stage: Stage, token: CancellationToken) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage,
            spawned_at: Utc::now(),
            token,
        }
    }

    pub fn name(&self) -> &'static str {
        self.stage.worker_name()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn info(&self) -> WorkerInfo {
        WorkerInfo {
            id: self.id,
            name: self.name(),
            stage: self.stage,
            spawned_at: self.spawned_at,
        }
    }
}

/// Read-only view of a registered worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerInfo {
    pub id: Uuid,
    pub name: &'static str,
    pub stage: Stage,
    pub spawned_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WorkerRegistry {
    workers: IndexMap<Uuid, WorkerHandle>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handle: WorkerHandle) -> Uuid {
        let id = handle.id;
        self.workers.insert(id, handle);
        id
    }

    /// Forget a worker that finished on its own.
    pub fn remove(&mut self, id: Uuid) -> Option<WorkerHandle> {
        self.workers.shift_remove(&id)
    }

    /// Cancel every registered worker and clear the registry. Returns the
    /// number of workers swept.
    pub fn sweep(&mut self) -> usize {
        for worker in self.workers.values() {
            tracing::debug!(worker_id = %worker.id, worker = worker.name(), "Cancelling worker");
            worker.cancel();
        }
        let count = self.workers.len();
        self.workers.clear();
        count
    }

    /// Stage of the registered non-batch worker, if any.
    pub fn busy_stage(&self) -> Option<Stage> {
        self.workers
            .values()
            .map(|w| w.stage)
            .find(|stage| *stage != Stage::Batch)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn infos(&self) -> Vec<WorkerInfo> {
        self.workers.values().map(WorkerHandle::info).collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sweep_cancels_and_clears() {
        let mut registry = WorkerRegistry::new();
        let a = CancellationToken::new();
        let b = CancellationToken::new();
        registry.register(WorkerHandle::new(Stage::Synthesis, a.clone()));
        registry.register(WorkerHandle::new(Stage::Batch, b.clone()));

        assert_eq!(registry.sweep(), 2);
        assert!(registry.is_empty());
        assert!(a.is_cancelled());
        assert!(b.is_cancelled());
    }

    #[test]
    fn batch_workers_do_not_count_as_busy() {
        let mut registry = WorkerRegistry::new();
        let batch = registry.register(WorkerHandle::new(Stage::Batch, CancellationToken::new()));
        assert_eq!(registry.busy_stage(), None);

        registry.register(WorkerHandle::new(Stage::Global, CancellationToken::new()));
        assert_eq!(registry.busy_stage(), Some(Stage::Global));

        let removed = registry.remove(batch).unwrap();
        assert_eq!(removed.name(), "batch_th");
        assert_eq!(registry.len(), 1);
    }
}
