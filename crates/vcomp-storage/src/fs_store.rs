//! File-per-job snapshot store.
//!
//! Each job is one JSON document at `<dir>/<job_id>.json`. Writes land in a
//! hidden temporary file in the same directory and are renamed over the
//! target, so a reader sees either the previous snapshot or the new one.
//! Readers still treat empty or unparseable documents as "not yet
//! readable" since the directory may be shared with other writers.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

use vcomp_models::{JobId, JobSnapshot};

use crate::error::{StorageError, StorageResult};
use crate::job_store::{sort_newest_first, JobStore};

const SNAPSHOT_EXTENSION: &str = "json";

/// [`JobStore`] backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct FsJobStore {
    dir: PathBuf,
}

impl FsJobStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn snapshot_path(&self, job_id: &JobId) -> PathBuf {
        self.dir
            .join(format!("{}.{}", job_id.as_str(), SNAPSHOT_EXTENSION))
    }

    fn temp_path(&self, job_id: &JobId) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.tmp", job_id.as_str(), Uuid::new_v4().simple()))
    }
}

#[async_trait]
impl JobStore for FsJobStore {
    async fn save(&self, snapshot: &JobSnapshot) -> StorageResult<()> {
        if !snapshot.job_id.is_path_safe() {
            return Err(StorageError::invalid_key(snapshot.job_id.as_str()));
        }

        fs::create_dir_all(&self.dir).await?;

        let payload = serde_json::to_vec(snapshot)?;
        let target = self.snapshot_path(&snapshot.job_id);
        let tmp = self.temp_path(&snapshot.job_id);

        fs::write(&tmp, &payload).await?;

        if let Err(e) = fs::rename(&tmp, &target).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(StorageError::write_failed(format!(
                "Failed to publish snapshot {}: {}",
                target.display(),
                e
            )));
        }

        debug!(
            job_id = %snapshot.job_id,
            status = snapshot.status.as_str(),
            progress = snapshot.progress,
            "Recorded job snapshot"
        );
        Ok(())
    }

    async fn load(&self, job_id: &JobId) -> StorageResult<Option<JobSnapshot>> {
        if !job_id.is_path_safe() {
            return Ok(None);
        }

        read_snapshot(&self.snapshot_path(job_id)).await
    }

    async fn list(&self) -> StorageResult<Vec<JobSnapshot>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_snapshot_file(&path) {
                continue;
            }
            match read_snapshot(&path).await {
                Ok(Some(snapshot)) => snapshots.push(snapshot),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable job record {}: {}", path.display(), e),
            }
        }

        sort_newest_first(&mut snapshots);
        Ok(snapshots)
    }
}

/// Read one snapshot; missing, empty and truncated files are all `None`.
async fn read_snapshot(path: &Path) -> StorageResult<Option<JobSnapshot>> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    match serde_json::from_slice::<JobSnapshot>(&bytes) {
        Ok(snapshot) => Ok(Some(snapshot)),
        Err(e) => {
            debug!("Job record {} not readable yet: {}", path.display(), e);
            Ok(None)
        }
    }
}

fn is_snapshot_file(path: &Path) -> bool {
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map_or(true, |n| n.starts_with('.'));
    !hidden && path.extension().and_then(|e| e.to_str()) == Some(SNAPSHOT_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;
    use vcomp_models::JobStatus;

    fn store() -> (TempDir, FsJobStore) {
        let dir = TempDir::new().unwrap();
        let store = FsJobStore::new(dir.path().join("jobs"));
        (dir, store)
    }

    #[tokio::test]
    async fn test_record_and_load() {
        let (_dir, store) = store();
        let id = JobId::new();

        let written = store
            .record(&id, JobStatus::Processing, 42, None)
            .await
            .unwrap();
        let loaded = store.load(&id).await.unwrap().unwrap();

        assert_eq!(loaded, written);
        assert_eq!(loaded.progress, 42);
        assert!(store.dir.join(format!("{id}.json")).exists());
    }

    #[tokio::test]
    async fn test_snapshot_replaces_previous() {
        let (_dir, store) = store();
        let id = JobId::new();

        store.record(&id, JobStatus::Processing, 10, None).await.unwrap();
        store
            .record(&id, JobStatus::Failed, 10, Some("boom".to_string()))
            .await
            .unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.status, JobStatus::Failed);
        assert_eq!(loaded.error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_truncated_snapshot_is_not_found() {
        let (_dir, store) = store();
        let id = JobId::new();
        store.record(&id, JobStatus::Processing, 5, None).await.unwrap();

        let path = store.dir.join(format!("{id}.json"));
        let full = std::fs::read(&path).unwrap();
        std::fs::write(&path, &full[..full.len() / 2]).unwrap();
        assert!(store.load(&id).await.unwrap().is_none());

        std::fs::write(&path, b"").unwrap();
        assert!(store.load(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_and_unsafe_ids() {
        let (_dir, store) = store();
        assert!(store.load(&JobId::new()).await.unwrap().is_none());
        assert!(store
            .load(&JobId::from_string("../etc/passwd"))
            .await
            .unwrap()
            .is_none());

        let err = tokio_test::assert_err!(
            store
                .record(&JobId::from_string("a/b"), JobStatus::Queued, 0, None)
                .await
        );
        assert!(matches!(err, StorageError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn test_list_skips_unreadable_records() {
        let (_dir, store) = store();
        let older = JobId::new();
        let newer = JobId::new();

        let mut snapshot = JobSnapshot::new(older.clone(), JobStatus::Completed, 100, None);
        snapshot.updated_at = Utc::now() - Duration::seconds(30);
        store.save(&snapshot).await.unwrap();
        store.record(&newer, JobStatus::Queued, 0, None).await.unwrap();

        std::fs::write(store.dir.join("broken.json"), b"{\"job_id\":").unwrap();
        std::fs::write(store.dir.join(".pending.tmp"), b"{}").unwrap();
        std::fs::write(store.dir.join("notes.txt"), b"hello").unwrap();

        let listed = store.list().await.unwrap();
        let ids: Vec<&JobId> = listed.iter().map(|s| &s.job_id).collect();
        assert_eq!(ids, vec![&newer, &older]);
    }

    #[tokio::test]
    async fn test_list_missing_directory() {
        let (_dir, store) = store();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_writers_on_distinct_jobs() {
        let (_dir, store) = store();
        let store = std::sync::Arc::new(store);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = JobId::new();
                for progress in 0..20u8 {
                    store
                        .record(&id, JobStatus::Processing, progress, None)
                        .await
                        .unwrap();
                    let seen = store.load(&id).await.unwrap().unwrap();
                    assert_eq!(seen.progress, progress);
                    assert_eq!(seen.status, JobStatus::Processing);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let jobs = store.list().await.unwrap();
        assert_eq!(jobs.len(), 8);
        assert!(jobs.iter().all(|job| job.progress == 19));
    }
}
