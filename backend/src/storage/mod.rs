//! Blob storage access: credential issuance and existence checks
//!
//! File bytes never pass through this service. Callers receive signed URLs
//! and talk to the storage service directly.

mod azure;
mod credential;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
mod sas;
mod settings;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, TimeDelta, Utc};

pub use azure::AzureBlobStore;
pub use credential::{AccessCredential, Permission};
pub use error::{StorageError, StorageResult};
pub use sas::{BlobSasSigner, SAS_VERSION};
pub use settings::{StorageSettings, DEFAULT_CONTAINER_NAME};

/// Validity of the write credential handed out for an upload
pub const UPLOAD_WINDOW_SECS: i64 = 3600;

/// Validity of a re-issued download credential
pub const DOWNLOAD_WINDOW_SECS: i64 = 3600;

/// Storage backend the service signs URLs for
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Whether `object_name` exists in the container
    async fn exists(&self, object_name: &str) -> StorageResult<bool>;

    /// Signed URL for `object_name`, valid from `valid_from` until `valid_until`.
    /// Must be deterministic in its arguments.
    async fn sign(
        &self,
        object_name: &str,
        permission: Permission,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> StorageResult<AccessCredential>;
}

/// Issues credentials that start now
#[derive(Clone)]
pub struct CredentialIssuer {
    store: Arc<dyn BlobStore>,
}

impl CredentialIssuer {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Credential granting `permission` on `object_name` from now for `validity`
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails to sign
    pub async fn issue(
        &self,
        object_name: &str,
        permission: Permission,
        validity: TimeDelta,
    ) -> StorageResult<AccessCredential> {
        // the signed timestamps carry whole seconds only
        let valid_from = Utc::now().trunc_subsecs(0);
        self.store
            .sign(object_name, permission, valid_from, valid_from + validity)
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot answer
    pub async fn exists(&self, object_name: &str) -> StorageResult<bool> {
        self.store.exists(object_name).await
    }
}

/// Credential issuer as configured at startup.
///
/// Empty when the storage account settings are missing or invalid; every
/// endpoint that needs a credential then answers with a configuration error.
#[derive(Clone, Default)]
pub struct StorageHandle {
    issuer: Option<CredentialIssuer>,
}

impl StorageHandle {
    #[must_use]
    pub fn configured(store: Arc<dyn BlobStore>) -> Self {
        Self {
            issuer: Some(CredentialIssuer::new(store)),
        }
    }

    #[must_use]
    pub const fn unconfigured() -> Self {
        Self { issuer: None }
    }

    /// Builds the Azure backend from `STORAGE_*` variables, logging why
    /// credential issuance is disabled if that fails
    #[must_use]
    pub fn from_env(http_client: reqwest::Client) -> Self {
        let store = StorageSettings::from_env().and_then(|settings| {
            tracing::info!(
                account = %settings.account_name,
                container = %settings.container_name,
                endpoint = %settings.blob_endpoint(),
                "Configured blob storage"
            );
            AzureBlobStore::new(&settings, http_client)
        });

        match store {
            Ok(store) => Self::configured(Arc::new(store)),
            Err(err) => {
                tracing::error!("Credential issuance disabled: {err}");
                Self::unconfigured()
            }
        }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.issuer.is_some()
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotConfigured` if no backend was configured
    pub fn issuer(&self) -> StorageResult<&CredentialIssuer> {
        self.issuer
            .as_ref()
            .ok_or(StorageError::NotConfigured("storage account"))
    }
}
