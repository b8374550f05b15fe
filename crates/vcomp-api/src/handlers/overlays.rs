//! Overlay asset registration.

use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use vcomp_models::{AssetRef, OverlayKind};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct UploadOverlayResponse {
    /// Reference to put in an overlay's `content`
    pub filename: AssetRef,
    #[serde(rename = "type")]
    pub kind: OverlayKind,
}

/// Register an image or clip asset (`overlay` field, optional `type` field).
pub async fn upload_overlay(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadOverlayResponse>> {
    let mut asset = None;
    let mut kind = OverlayKind::Image;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("overlay") => {
                let filename = field.file_name().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {e}")))?;
                asset = Some((filename, data));
            }
            Some("type") => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Invalid type field: {e}")))?;
                kind = value.parse()?;
            }
            _ => {}
        }
    }

    let (filename, data) = asset.ok_or_else(|| ApiError::bad_request("Missing 'overlay' file"))?;
    if kind == OverlayKind::Text {
        return Err(ApiError::bad_request("Text overlays do not take an asset"));
    }

    let reference = state
        .executor
        .register_asset(&data, filename.as_deref())
        .await?;

    Ok(Json(UploadOverlayResponse {
        filename: reference,
        kind,
    }))
}
