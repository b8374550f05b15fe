//! In-memory job store.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use vcomp_models::{JobId, JobSnapshot};

use crate::error::StorageResult;
use crate::job_store::{sort_newest_first, JobStore};

/// [`JobStore`] kept in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    snapshots: RwLock<HashMap<JobId, JobSnapshot>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn save(&self, snapshot: &JobSnapshot) -> StorageResult<()> {
        self.snapshots
            .write()
            .await
            .insert(snapshot.job_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> StorageResult<Option<JobSnapshot>> {
        Ok(self.snapshots.read().await.get(job_id).cloned())
    }

    async fn list(&self) -> StorageResult<Vec<JobSnapshot>> {
        let mut all: Vec<JobSnapshot> = self.snapshots.read().await.values().cloned().collect();
        sort_newest_first(&mut all);
        Ok(all)
    }
}
