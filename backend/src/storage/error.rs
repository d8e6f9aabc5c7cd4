//! Error types for blob storage operations

use thiserror::Error;

/// Result type for blob storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while signing URLs or talking to blob storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// A required configuration value is absent
    #[error("Storage account configuration missing: {0}")]
    NotConfigured(&'static str),

    /// The account key could not be decoded
    #[error("Storage account key is not valid base64: {0}")]
    InvalidAccountKey(String),

    /// The blob endpoint cannot carry a path
    #[error("Invalid blob endpoint: {0}")]
    InvalidEndpoint(String),

    /// A URL could not be built
    #[error("Invalid storage URL: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure talking to the blob endpoint
    #[error("Storage request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The blob endpoint answered with a status we do not handle
    #[error("Unexpected storage response status {status} for {object_name}")]
    UnexpectedStatus {
        /// HTTP status code returned by the endpoint
        status: u16,
        /// Object that was probed
        object_name: String,
    },
}
