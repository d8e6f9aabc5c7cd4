//! Upload request validation
//!
//! Checks run in a fixed order and stop at the first failure, so no
//! credential is ever issued for a request that fails any of them.

use schemars::JsonSchema;
use serde::Deserialize;
use thiserror::Error;

use super::{extension_of, is_extension_allowed, sanitize_filename, FilenameRejection};

/// Largest declared file size accepted: 5 GiB
pub const MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024 * 1024;

/// Shortest share lifetime in days
pub const MIN_EXPIRATION_DAYS: i64 = 1;

/// Longest share lifetime in days
pub const MAX_EXPIRATION_DAYS: i64 = 30;

/// Share lifetime as sent by the browser: a JSON number or a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ExpirationDays {
    /// `7`
    Number(f64),
    /// `"7"`
    Text(String),
}

impl ExpirationDays {
    /// Whole number of days, if the value holds one.
    ///
    /// Text is read as a number first, so `"7.0"` and `7.0` agree.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_days(&self) -> Option<i64> {
        let days = match self {
            Self::Number(n) => *n,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };

        (days.is_finite() && days.fract() == 0.0).then_some(days as i64)
    }

    /// Whether the browser sent the field in a form that counts as absent
    fn is_blank(&self) -> bool {
        match self {
            Self::Number(n) => *n == 0.0,
            Self::Text(text) => text.is_empty(),
        }
    }
}

/// An upload request that passed every check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    /// Sanitized filename, without the uniqueness token
    pub filename: String,
    /// Share lifetime in days, within `[MIN_EXPIRATION_DAYS, MAX_EXPIRATION_DAYS]`
    pub expiration_days: i64,
}

/// Reasons an upload request is refused before any credential is issued
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UploadValidationError {
    /// `filename` or `expirationDays` is absent
    #[error("filename and expirationDays are required")]
    MissingFields,

    /// Declared size above [`MAX_FILE_SIZE_BYTES`]
    #[error("File size exceeds 5GB limit")]
    FileTooLarge {
        /// Declared size in bytes
        size: u64,
    },

    /// `expirationDays` is not a whole number between 1 and 30
    #[error("expirationDays must be between 1 and 30")]
    InvalidExpiration,

    /// Filename failed sanitization
    #[error("Invalid filename")]
    InvalidFilename(#[from] FilenameRejection),

    /// Filename has a denied extension
    #[error("File type not allowed for security reasons")]
    ProhibitedExtension {
        /// The offending extension, lowercased
        extension: String,
    },
}

/// Validates the fields of an upload request.
///
/// Order: required fields, declared size, expiration range, filename
/// sanitization, extension policy.
///
/// # Errors
///
/// Returns the first [`UploadValidationError`] encountered.
pub fn validate_upload(
    filename: Option<&str>,
    expiration_days: Option<&ExpirationDays>,
    file_size: Option<u64>,
) -> Result<ValidatedUpload, UploadValidationError> {
    let (Some(filename), Some(expiration_days)) = (
        filename.filter(|name| !name.is_empty()),
        expiration_days.filter(|days| !days.is_blank()),
    ) else {
        return Err(UploadValidationError::MissingFields);
    };

    if let Some(size) = file_size.filter(|size| *size > MAX_FILE_SIZE_BYTES) {
        return Err(UploadValidationError::FileTooLarge { size });
    }

    let expiration_days = expiration_days
        .as_days()
        .filter(|days| (MIN_EXPIRATION_DAYS..=MAX_EXPIRATION_DAYS).contains(days))
        .ok_or(UploadValidationError::InvalidExpiration)?;

    let filename = sanitize_filename(filename)?;

    if !is_extension_allowed(&filename) {
        return Err(UploadValidationError::ProhibitedExtension {
            extension: extension_of(&filename),
        });
    }

    Ok(ValidatedUpload {
        filename,
        expiration_days,
    })
}
