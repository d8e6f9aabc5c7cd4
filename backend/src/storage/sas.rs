//! Azure Blob service shared access signatures
//!
//! A SAS is an HMAC-SHA256 over the permission, validity window and resource
//! path, keyed with the storage account key. The storage service recomputes it
//! on every request, so nothing has to be stored to honour or expire a URL.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use super::{AccessCredential, Permission, StorageError, StorageResult, StorageSettings};

type HmacSha256 = Hmac<Sha256>;

/// Storage service version the signature is computed for
pub const SAS_VERSION: &str = "2020-12-06";

/// Signed resource type: a single blob
const SIGNED_RESOURCE_BLOB: &str = "b";

/// Signs blob URLs for one container with the account key
#[derive(Clone)]
pub struct BlobSasSigner {
    account_name: String,
    key: Vec<u8>,
    container: String,
    endpoint: Url,
}

impl std::fmt::Debug for BlobSasSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobSasSigner")
            .field("account_name", &self.account_name)
            .field("container", &self.container)
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl BlobSasSigner {
    /// Builds a signer from storage settings
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidAccountKey` if the key is not base64
    /// Returns `StorageError::Url` if the blob endpoint is not a valid URL
    pub fn new(settings: &StorageSettings) -> StorageResult<Self> {
        let key = STANDARD
            .decode(settings.account_key.trim())
            .map_err(|e| StorageError::InvalidAccountKey(e.to_string()))?;

        let endpoint = Url::parse(&settings.blob_endpoint())?;
        if endpoint.cannot_be_a_base() {
            return Err(StorageError::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            account_name: settings.account_name.clone(),
            key,
            container: settings.container_name.clone(),
            endpoint,
        })
    }

    /// Unsigned URL of an object in the container
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidEndpoint` if the endpoint cannot carry a path
    pub fn blob_url(&self, object_name: &str) -> StorageResult<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| StorageError::InvalidEndpoint(self.endpoint.to_string()))?
            .pop_if_empty()
            .push(&self.container)
            .push(object_name);
        Ok(url)
    }

    /// Protocols the SAS is valid for. Plain-http endpoints (Azurite) need
    /// `http` to be allowed as well.
    fn signed_protocol(&self) -> &'static str {
        if self.endpoint.scheme() == "https" {
            "https"
        } else {
            "https,http"
        }
    }

    /// Newline-joined fields covered by the signature, in service order
    #[must_use]
    pub fn string_to_sign(
        &self,
        object_name: &str,
        permission: Permission,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> String {
        let canonicalized_resource = format!(
            "/blob/{}/{}/{}",
            self.account_name, self.container, object_name
        );
        let start = format_sas_time(valid_from);
        let expiry = format_sas_time(valid_until);

        [
            permission.as_sas(),
            start.as_str(),
            expiry.as_str(),
            canonicalized_resource.as_str(),
            "", // signed identifier
            "", // signed IP
            self.signed_protocol(),
            SAS_VERSION,
            SIGNED_RESOURCE_BLOB,
            "", // snapshot time
            "", // encryption scope
            "", // rscc
            "", // rscd
            "", // rsce
            "", // rscl
            "", // rsct
        ]
        .join("\n")
    }

    /// Base64 HMAC-SHA256 of `string_to_sign` under the account key
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidAccountKey` if the key is rejected by the MAC
    pub fn sign(&self, string_to_sign: &str) -> StorageResult<String> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::InvalidAccountKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Signed URL granting `permission` on `object_name` between `valid_from`
    /// and `valid_until`.
    ///
    /// The output depends only on the arguments and the account key.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the URL cannot be built or signed
    pub fn credential(
        &self,
        object_name: &str,
        permission: Permission,
        valid_from: DateTime<Utc>,
        valid_until: DateTime<Utc>,
    ) -> StorageResult<AccessCredential> {
        let signature =
            self.sign(&self.string_to_sign(object_name, permission, valid_from, valid_until))?;

        let mut url = self.blob_url(object_name)?;
        url.query_pairs_mut()
            .append_pair("sv", SAS_VERSION)
            .append_pair("st", &format_sas_time(valid_from))
            .append_pair("se", &format_sas_time(valid_until))
            .append_pair("sr", SIGNED_RESOURCE_BLOB)
            .append_pair("sp", permission.as_sas())
            .append_pair("spr", self.signed_protocol())
            .append_pair("sig", &signature);

        Ok(AccessCredential {
            object_name: object_name.to_string(),
            permission,
            valid_from,
            valid_until,
            signature,
            url,
        })
    }
}

/// ISO 8601 UTC without fractional seconds, as the service expects
fn format_sas_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}
