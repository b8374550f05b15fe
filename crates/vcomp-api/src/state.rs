//! Application state.

use std::sync::Arc;

use vcomp_storage::{FsJobStore, StorageLayout};
use vcomp_worker::{JobExecutor, WorkerConfig};

use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub executor: Arc<JobExecutor>,
}

impl AppState {
    pub fn new(config: ApiConfig, executor: Arc<JobExecutor>) -> Self {
        Self { config, executor }
    }

    /// Prepare the data directory and build an FFmpeg-backed executor.
    ///
    /// Job records from a previous run are cleared here.
    pub async fn from_config(config: ApiConfig, worker: WorkerConfig) -> ApiResult<Self> {
        let layout = StorageLayout::new(&config.data_dir);
        layout
            .prepare()
            .await
            .map_err(|e| ApiError::internal(format!("Failed to prepare data directory: {e}")))?;

        let store = Arc::new(FsJobStore::new(layout.jobs_dir()));
        let executor = Arc::new(JobExecutor::with_ffmpeg(worker, layout, store));

        Ok(Self::new(config, executor))
    }
}
