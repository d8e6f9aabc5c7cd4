use chrono::{DateTime, Utc};
use url::Url;

/// Operation a credential grants on a single object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Download the object
    Read,
    /// Create or overwrite the object
    Write,
}

impl Permission {
    /// Single-letter SAS permission code
    #[must_use]
    pub const fn as_sas(self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
        }
    }
}

/// Signed, time-bounded access to one storage object.
///
/// Created fresh for each request and handed to the caller; nothing about it
/// is stored server side and it cannot be revoked before `valid_until`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCredential {
    /// Object the credential is scoped to
    pub object_name: String,
    /// Granted operation
    pub permission: Permission,
    /// Start of validity
    pub valid_from: DateTime<Utc>,
    /// End of validity
    pub valid_until: DateTime<Utc>,
    /// Base64 HMAC over the signed fields
    pub signature: String,
    /// Object URL carrying the signed query string
    pub url: Url,
}
