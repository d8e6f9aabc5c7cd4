use axum::{extract::Query, http::StatusCode, Extension, Json};
use chrono::TimeDelta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    storage::{Permission, StorageHandle, DOWNLOAD_WINDOW_SECS},
    types::AppError,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub struct DownloadUrlQuery {
    /// Object name returned by the upload endpoint
    #[serde(rename = "blobName", default)]
    pub blob_name: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    /// Read-only URL, valid for one hour
    pub download_url: String,
}

/// Re-issue a short-lived download URL for an uploaded object
#[instrument(skip(storage))]
pub async fn create_download_url(
    Extension(storage): Extension<StorageHandle>,
    Query(query): Query<DownloadUrlQuery>,
) -> Result<Json<DownloadResponse>, AppError> {
    let Some(blob_name) = query.blob_name.filter(|name| !name.is_empty()) else {
        return Err(AppError::new(
            StatusCode::BAD_REQUEST,
            "missing_blob_name",
            "blobName is required",
            false,
        ));
    };

    let issuer = storage.issuer()?;

    if !issuer.exists(&blob_name).await? {
        return Err(AppError::new(
            StatusCode::NOT_FOUND,
            "not_found",
            "File not found",
            false,
        ));
    }

    let read = issuer
        .issue(
            &blob_name,
            Permission::Read,
            TimeDelta::seconds(DOWNLOAD_WINDOW_SECS),
        )
        .await?;

    Ok(Json(DownloadResponse {
        download_url: read.url.into(),
    }))
}
