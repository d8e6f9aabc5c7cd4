//! Storage account configuration read from the environment

use std::env;

use super::{StorageError, StorageResult};

/// Container used when `STORAGE_CONTAINER_NAME` is unset
pub const DEFAULT_CONTAINER_NAME: &str = "upload";

/// Storage account identity, secret and target container
#[derive(Clone, PartialEq, Eq)]
pub struct StorageSettings {
    /// `STORAGE_ACCOUNT_NAME`
    pub account_name: String,
    /// `STORAGE_ACCOUNT_KEY`, base64 encoded
    pub account_key: String,
    /// `STORAGE_CONTAINER_NAME`
    pub container_name: String,
    /// `STORAGE_BLOB_ENDPOINT`, for Azurite or sovereign clouds
    pub blob_endpoint: Option<String>,
}

impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("blob_endpoint", &self.blob_endpoint)
            .finish()
    }
}

impl StorageSettings {
    /// Reads the storage settings from the environment
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotConfigured` if the account name or key is
    /// unset or empty
    pub fn from_env() -> StorageResult<Self> {
        let account_name = non_empty_var("STORAGE_ACCOUNT_NAME")
            .ok_or(StorageError::NotConfigured("STORAGE_ACCOUNT_NAME"))?;
        let account_key = non_empty_var("STORAGE_ACCOUNT_KEY")
            .ok_or(StorageError::NotConfigured("STORAGE_ACCOUNT_KEY"))?;

        Ok(Self {
            account_name,
            account_key,
            container_name: non_empty_var("STORAGE_CONTAINER_NAME")
                .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string()),
            blob_endpoint: non_empty_var("STORAGE_BLOB_ENDPOINT"),
        })
    }

    /// Blob service endpoint, defaulting to the public cloud account URL
    #[must_use]
    pub fn blob_endpoint(&self) -> String {
        self.blob_endpoint.clone().unwrap_or_else(|| {
            format!("https://{}.blob.core.windows.net", self.account_name)
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}
