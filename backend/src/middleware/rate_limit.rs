use std::sync::Arc;

use aide::OperationIo;
use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
    Extension,
};
use chrono::Utc;

use crate::{
    rate_limit::{RateLimitDecision, RateLimiter},
    types::AppError,
};

/// Identity used when no forwarding header is present
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Client identity from proxy headers: the first `X-Forwarded-For` entry,
/// then `X-Real-IP`, then [`UNKNOWN_CLIENT`]
#[must_use]
pub fn client_identity(headers: &HeaderMap) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    header("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| header("x-real-ip"))
        .unwrap_or(UNKNOWN_CLIENT)
        .to_string()
}

/// Admission granted by the rate limiter for the current request
#[derive(Debug, Clone, OperationIo)]
pub struct Admission {
    /// Identity the request was counted against
    pub client_id: String,
    /// Decision returned by the limiter
    pub decision: RateLimitDecision,
}

/// Axum extractor for the admission recorded by [`rate_limit_middleware`]
impl<S> FromRequestParts<S> for Admission
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Self>().cloned().ok_or_else(|| {
            AppError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "missing_admission",
                "Route is not behind the rate limiter",
                false,
            )
        })
    }
}

/// Rate limiting middleware
///
/// This middleware:
/// 1. Derives the client identity from forwarding headers
/// 2. Asks the `RateLimiter` to admit and count the request
/// 3. Returns 429 with `Retry-After` and `X-RateLimit-*` headers when rejected
/// 4. Adds `Admission` to request extensions otherwise and the
///    `X-RateLimit-*` headers to whatever the inner service answers,
///    CORS preflights included
///
/// # Errors
///
/// - `AppError` - Rate limit exceeded with 429 status code
pub async fn rate_limit_middleware(
    Extension(rate_limiter): Extension<Arc<dyn RateLimiter>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client_id = client_identity(request.headers());
    let decision = rate_limiter.check_and_record(&client_id).await;

    if !decision.allowed {
        tracing::warn!(
            client_id = %client_id,
            reset_at = %decision.reset_at,
            "Rate limit exceeded"
        );
        return Err(AppError::rate_limited(&decision, Utc::now()));
    }

    tracing::debug!(client_id = %client_id, remaining = decision.remaining, "Request admitted");
    request
        .extensions_mut()
        .insert(Admission { client_id, decision });

    let mut response = next.run(request).await;
    response.headers_mut().extend(decision.headers());
    Ok(response)
}
