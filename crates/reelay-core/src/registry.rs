//! Concurrent job registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::{JobCounts, JobId, JobRecord};

/// Shared map from job identifier to its record.
///
/// Every mutation runs under the write lock against the whole record, so
/// readers always observe a consistent snapshot.
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<JobId, JobRecord>>>,
}

impl JobRegistry {
    /// Construct an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running record for `id`, returning its snapshot.
    ///
    /// An existing record with the same identifier is left untouched.
    pub fn create(&self, id: JobId) -> JobRecord {
        self.write()
            .entry(id)
            .or_insert_with(|| JobRecord::new(id))
            .clone()
    }

    /// Snapshot of the record for `id`.
    #[must_use]
    pub fn get(&self, id: JobId) -> Option<JobRecord> {
        self.read().get(&id).cloned()
    }

    /// Apply `f` to the record for `id` atomically.
    ///
    /// Returns `None` when the record does not exist.
    pub fn mutate<F, R>(&self, id: JobId, f: F) -> Option<R>
    where
        F: FnOnce(&mut JobRecord) -> R,
    {
        self.write().get_mut(&id).map(f)
    }

    /// Evict the record for `id`, returning its final state.
    pub fn remove(&self, id: JobId) -> Option<JobRecord> {
        self.write().remove(&id)
    }

    /// Totals per status.
    #[must_use]
    pub fn counts(&self) -> JobCounts {
        let mut counts = JobCounts::default();
        for record in self.read().values() {
            counts.record(record.status());
        }
        counts
    }

    /// Number of tracked jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns true when no jobs are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.read().unwrap_or_else(|err| {
            panic!("failed to acquire job registry read lock: {err}");
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<JobId, JobRecord>> {
        self.jobs.write().unwrap_or_else(|err| {
            panic!("failed to acquire job registry write lock: {err}");
        })
    }
}
