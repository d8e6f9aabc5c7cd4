//! In-process blob store for tests

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    AccessCredential, BlobSasSigner, BlobStore, Permission, StorageError, StorageResult,
    StorageSettings,
};

/// Account used by [`InMemoryBlobStore::with_dev_account`]
pub const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known Azurite development key
pub const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Signs exactly like the real backend but answers existence checks from a
/// set of object names held in memory
#[derive(Debug)]
pub struct InMemoryBlobStore {
    signer: BlobSasSigner,
    objects: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
}

impl InMemoryBlobStore {
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot produce a signer
    pub fn new(settings: &StorageSettings) -> StorageResult<Self> {
        Ok(Self {
            signer: BlobSasSigner::new(settings)?,
            objects: RwLock::new(HashSet::new()),
            unavailable: AtomicBool::new(false),
        })
    }

    /// Store for the Azurite development account and the default container
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot produce a signer
    pub fn with_dev_account() -> StorageResult<Self> {
        Self::new(&StorageSettings {
            account_name: DEV_ACCOUNT_NAME.to_string(),
            account_key: DEV_ACCOUNT_KEY.to_string(),
            container_name: super::DEFAULT_CONTAINER_NAME.to_string(),
            blob_endpoint: None,
        })
    }

    #[must_use]
    pub const fn signer(&self) -> &BlobSasSigner {
        &self.signer
    }

    /// Marks an object as uploaded
    pub async fn insert(&self, object_name: impl Into<String>) {
        self.objects.write().await.insert(object_name.into());
    }

    /// Makes every existence check fail as if the service returned 503
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn exists(&self, object_name: &str) -> StorageResult<bool> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StorageError::UnexpectedStatus {
                status: 503,
                object_name: object_name.to_string(),
            });
        }
        Ok(self.objects.read().await.contains(object_name))
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
