//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    extract::rejection::JsonRejection,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use crate::{
    policy::UploadValidationError,
    rate_limit::RateLimitDecision,
    storage::StorageError,
};

/// API error response envelope consumed by the upload page
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Human-readable error message, shown to the user as-is
    pub error: String,
    /// Machine-readable error code
    pub code: &'static str,
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Diagnostic detail for unexpected failures
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Seconds until the client may retry (rate limiting only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Localized retry hint (rate limiting only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    headers: HeaderMap,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub fn new(
        status: StatusCode,
        code: &'static str,
        msg: impl Into<String>,
        retry: bool,
    ) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            inner: ApiErrorResponse {
                error: msg.into(),
                code,
                allow_retry: retry,
                details: None,
                retry_after: None,
                message: None,
            },
        }
    }

    /// Attach diagnostic detail to the response body
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.inner.details = Some(details.into());
        self
    }

    /// Build the 429 response for a rejected admission
    #[must_use]
    pub fn rate_limited(decision: &RateLimitDecision, now: DateTime<Utc>) -> Self {
        let retry_after = decision.retry_after_secs(now);
        let mut headers = decision.headers();
        headers.insert(axum::http::header::RETRY_AFTER, retry_after.into());

        let mut error = Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "Rate limit exceeded",
            true,
        );
        error.headers = headers;
        error.inner.retry_after = Some(retry_after);
        error.inner.message = Some(format!(
            "Up to {} requests per minute are allowed. Please try again in {retry_after} seconds.",
            decision.limit
        ));
        error
    }

    /// HTTP status of this error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code of this error
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.inner.code
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.code,
                self.inner.error
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.code,
                self.inner.error
            ),
            _ => {}
        }

        (self.status, self.headers, Json(self.inner)).into_response()
    }
}

/// Convert JSON body rejections to application errors
impl From<JsonRejection> for AppError {
    fn from(err: JsonRejection) -> Self {
        tracing::warn!("JSON body rejected: {err}");
        match err {
            JsonRejection::MissingJsonContentType(_) => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_content_type",
                "Missing Content-Type: application/json header",
                false,
            ),
            JsonRejection::BytesRejection(body)
                if body.status() == StatusCode::PAYLOAD_TOO_LARGE =>
            {
                Self::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "payload_too_large",
                    "Request body too large",
                    false,
                )
            }
            _ => Self::new(
                StatusCode::BAD_REQUEST,
                "invalid_json",
                "Invalid JSON payload",
                false,
            ),
        }
    }
}

/// Convert upload validation failures to application errors
impl From<UploadValidationError> for AppError {
    fn from(err: UploadValidationError) -> Self {
        use UploadValidationError::{
            FileTooLarge, InvalidExpiration, InvalidFilename, MissingFields, ProhibitedExtension,
        };

        let (status, code) = match &err {
            MissingFields => (StatusCode::BAD_REQUEST, "missing_fields"),
            FileTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "file_too_large"),
            InvalidExpiration => (StatusCode::BAD_REQUEST, "invalid_expiration"),
            InvalidFilename(reason) => {
                tracing::debug!("Filename rejected: {reason}");
                (StatusCode::BAD_REQUEST, "invalid_filename")
            }
            ProhibitedExtension { extension } => {
                tracing::debug!("Extension rejected: {extension}");
                (StatusCode::BAD_REQUEST, "prohibited_file_type")
            }
        };

        Self::new(status, code, err.to_string(), false)
    }
}

/// Convert storage errors to application errors
impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match &err {
            StorageError::NotConfigured(_) | StorageError::InvalidAccountKey(_) => {
                tracing::error!("Configuration error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "configuration_error",
                    "Storage account configuration missing",
                    false,
                )
            }
            _ => {
                tracing::error!("Storage error: {err}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Failed to generate access URL",
                    true,
                )
                .with_details(err.to_string())
            }
        }
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
