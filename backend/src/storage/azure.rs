//! Azure Blob Storage backend

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;

use super::{
    AccessCredential, BlobSasSigner, BlobStore, Permission, StorageError, StorageResult,
    StorageSettings,
};

/// Lifetime of the read SAS used for existence probes
const PROBE_VALIDITY_SECS: i64 = 300;

/// Blob container addressed through SAS URLs.
///
/// Signing is local. The only network call is the existence probe.
#[derive(Debug)]
pub struct AzureBlobStore {
    signer: BlobSasSigner,
    http_client: reqwest::Client,
}

impl AzureBlobStore {
    /// Creates a new Azure blob store client
    ///
    /// # Arguments
    ///
    /// * `settings` - Storage account identity, key and container
    /// * `http_client` - Shared HTTP client used for existence probes
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidAccountKey` if the account key is not base64
    /// Returns `StorageError::Url` / `StorageError::InvalidEndpoint` for a bad endpoint
    pub fn new(settings: &StorageSettings, http_client: reqwest::Client) -> StorageResult<Self> {
        Ok(Self {
            signer: BlobSasSigner::new(settings)?,
            http_client,
        })
    }
}

#[async_trait]
impl BlobStore for AzureBlobStore {
    /// Checks if an object exists in the container
    ///
    /// Sends `HEAD` (Get Blob Properties) with a short-lived read SAS.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if the service answers 200
    /// * `Ok(false)` if it answers 404
    /// * `Err(StorageError)` for any other status or a transport failure
    async fn exists(&self, object_name: &str) -> StorageResult<bool> {
        let now = Utc::now();
        let probe = self.signer.credential(
            object_name,
            Permission::Read,
            now,
            now + TimeDelta::seconds(PROBE_VALIDITY_SECS),
        )?;

        let response = self.http_client.head(probe.url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(StorageError::UnexpectedStatus {
                status: status.as_u16(),
                object_name: object_name.to_string(),
            }),
        }
    }

    async fn sign(
        &self,
        object_name: &str,
        permission: Permission,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> StorageResult<AccessCredential> {
        self.signer
            .credential(object_name, permission, valid_from, valid_until)
    }
}
