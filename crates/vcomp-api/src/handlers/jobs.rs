//! Job submission and polling handlers.

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{self, Multipart, State};
use axum::http::header;
use axum::response::Response;
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use vcomp_models::{parse_overlays, JobId, JobSnapshot, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for a successful submission.
#[derive(Serialize)]
pub struct UploadResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Response for the job listing.
#[derive(Serialize)]
pub struct JobsResponse {
    pub count: usize,
    pub jobs: Vec<JobSnapshot>,
}

/// Accept a base video (`video` field) and an overlay list (`overlays`
/// field, JSON array, default `[]`) and start a composition job.
///
/// Once the video is on disk every rejection removes it again.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let job_id = JobId::new();
    let mut video_path = None;

    let submitted = submit_upload(&state, &job_id, &mut multipart, &mut video_path).await;
    if submitted.is_err() {
        if let Some(path) = &video_path {
            discard(path).await;
        }
    }

    Ok(Json(UploadResponse {
        job_id: submitted?,
        status: JobStatus::Queued,
    }))
}

/// Read the upload fields and submit the job. `video_path` is set as soon
/// as a file exists on disk so the caller can clean it up.
async fn submit_upload(
    state: &AppState,
    job_id: &JobId,
    multipart: &mut Multipart,
    video_path: &mut Option<PathBuf>,
) -> ApiResult<JobId> {
    let mut overlays_json = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("video") => {
                if video_path.is_some() {
                    return Err(ApiError::bad_request("Only one 'video' file is accepted"));
                }
                let filename = field.file_name().unwrap_or("video.mp4").to_string();
                let path = state.executor.layout().video_path(job_id, &filename);
                let bytes = save_field(field, &path).await?;
                info!(job_id = %job_id, bytes, "Saved uploaded video to {}", path.display());
                *video_path = Some(path);
            }
            Some("overlays") => {
                overlays_json = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid overlays field: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let path = video_path
        .clone()
        .ok_or_else(|| ApiError::bad_request("Missing 'video' file"))?;
    let overlays = parse_overlays(overlays_json.as_deref().unwrap_or("[]"))?;

    Ok(state
        .executor
        .submit_with_id(job_id.clone(), path, overlays)
        .await?)
}

/// Current snapshot of a job.
pub async fn status(
    State(state): State<AppState>,
    extract::Path(job_id): extract::Path<String>,
) -> ApiResult<Json<JobSnapshot>> {
    state
        .executor
        .status(&JobId::from_string(job_id))
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// Stream the rendered video of a completed job.
pub async fn result(
    State(state): State<AppState>,
    extract::Path(job_id): extract::Path<String>,
) -> ApiResult<Response> {
    let job_id = JobId::from_string(job_id);
    let path = state.executor.artifact(&job_id).await?;

    let file = tokio::fs::File::open(&path)
        .await
        .map_err(|_| ApiError::not_found("Output file not found"))?;
    let length = file.metadata().await.ok().map(|m| m.len());

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"render_{}.mp4\"", job_id),
        );
    if let Some(length) = length {
        builder = builder.header(header::CONTENT_LENGTH, length);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(format!("Failed to build response: {e}")))
}

/// All known jobs, newest first.
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<JobsResponse>> {
    let jobs = state.executor.list().await?;
    Ok(Json(JobsResponse {
        count: jobs.len(),
        jobs,
    }))
}

/// Stream a multipart field to `path`, returning the number of bytes written.
///
/// A partially written file is removed before an error is returned.
async fn save_field(field: Field<'_>, path: &Path) -> ApiResult<u64> {
    let file = tokio::fs::File::create(path)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create {}: {e}", path.display())))?;

    let written = write_field(field, file).await;
    if written.is_err() {
        discard(path).await;
    }
    written
}

async fn write_field(mut field: Field<'_>, mut file: tokio::fs::File) -> ApiResult<u64> {
    let mut written = 0u64;
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {e}")))?
    {
        file.write_all(&chunk)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to write upload: {e}")))?;
        written += chunk.len() as u64;
    }

    file.flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to write upload: {e}")))?;
    Ok(written)
}

async fn discard(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        warn!("Failed to remove rejected upload {}: {}", path.display(), e);
    }
}
