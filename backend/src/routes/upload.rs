use std::sync::Arc;

use axum::{Extension, Json};
use chrono::{SecondsFormat, TimeDelta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::{
    middleware::Admission,
    policy::{validate_upload, ExpirationDays, ObjectNameMinter},
    storage::{Permission, StorageHandle, UPLOAD_WINDOW_SECS},
    types::{AppError, JsonBody},
};

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    /// Original name of the file on the user's machine
    #[serde(default)]
    pub filename: Option<String>,
    /// Days the download link stays valid, 1 to 30
    #[serde(default)]
    pub expiration_days: Option<ExpirationDays>,
    /// MIME type reported by the browser (informational)
    #[serde(default)]
    pub content_type: Option<String>,
    /// Declared size in bytes, at most 5 GiB
    #[serde(default)]
    pub file_size: Option<u64>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Write-only URL, valid for one hour, to PUT the file to
    pub upload_url: String,
    /// Read-only URL to share once the upload completes
    pub download_url: String,
    /// Stored object name
    pub blob_name: String,
    /// When the download URL expires, ISO-8601 UTC with millisecond precision
    pub expires_on: String,
}

/// Issue a pair of signed URLs for a new upload
///
/// The upload URL grants write access for one hour. The download URL grants
/// read access for the requested number of days. Nothing is recorded about
/// the share; both links simply expire.
#[instrument(skip_all, fields(client_id = %admission.client_id))]
pub async fn create_upload_url(
    Extension(storage): Extension<StorageHandle>,
    Extension(minter): Extension<Arc<ObjectNameMinter>>,
    admission: Admission,
    JsonBody(payload): JsonBody<UploadRequest>,
) -> Result<Json<UploadResponse>, AppError> {
    // Step 1: Validate the request before touching storage
    let upload = validate_upload(
        payload.filename.as_deref(),
        payload.expiration_days.as_ref(),
        payload.file_size,
    )?;

    let issuer = storage.issuer()?;

    // Step 2: Give the object a name no other upload can collide with
    let blob_name = minter.mint(&upload.filename);

    // Step 3: Sign both URLs
    let write = issuer
        .issue(
            &blob_name,
            Permission::Write,
            TimeDelta::seconds(UPLOAD_WINDOW_SECS),
        )
        .await?;
    let read = issuer
        .issue(
            &blob_name,
            Permission::Read,
            TimeDelta::days(upload.expiration_days),
        )
        .await?;

    tracing::info!(
        blob_name = %blob_name,
        content_type = payload.content_type.as_deref().unwrap_or_default(),
        file_size = payload.file_size,
        expiration_days = upload.expiration_days,
        "Issued upload URL"
    );

    Ok(Json(UploadResponse {
        upload_url: write.url.into(),
        download_url: read.url.into(),
        blob_name,
        expires_on: read
            .valid_until
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}
