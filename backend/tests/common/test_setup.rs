use std::sync::Arc;

use axum::{body::Body, http::Request, response::Response, Router};
use fileshare_backend::{
    policy::ObjectNameMinter,
    rate_limit::{InMemoryRateLimiter, RateLimitPolicy},
    server,
    storage::{memory::InMemoryBlobStore, StorageHandle},
    types::Environment,
};
use tower::ServiceExt;

pub const UPLOAD_ROUTE: &str = "/api/generateUploadUrl";
pub const DOWNLOAD_ROUTE: &str = "/api/generateDownloadUrl";

/// Initialize tracing for tests
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Default limiter policy without the random sweep
pub fn test_policy() -> RateLimitPolicy {
    RateLimitPolicy {
        sweep_probability: 0.0,
        ..RateLimitPolicy::default()
    }
}

/// Router wired to an in-memory blob store and rate limiter
pub struct TestSetup {
    pub router: Router,
    pub store: Arc<InMemoryBlobStore>,
    pub rate_limiter: Arc<InMemoryRateLimiter>,
}

impl TestSetup {
    pub fn new() -> Self {
        Self::build(Environment::Development, test_policy(), true)
    }

    pub fn with_policy(policy: RateLimitPolicy) -> Self {
        Self::build(Environment::Development, policy, true)
    }

    /// Setup whose storage account settings were missing at startup
    pub fn unconfigured() -> Self {
        Self::build(Environment::Development, test_policy(), false)
    }

    pub fn with_environment(environment: Environment) -> Self {
        Self::build(environment, test_policy(), true)
    }

    fn build(environment: Environment, policy: RateLimitPolicy, configured: bool) -> Self {
        setup_test_env();

        let store = Arc::new(
            InMemoryBlobStore::with_dev_account().expect("Failed to create blob store"),
        );
        let storage = if configured {
            StorageHandle::configured(store.clone())
        } else {
            StorageHandle::unconfigured()
        };
        let rate_limiter = Arc::new(InMemoryRateLimiter::new(policy));

        let router = server::app(
            environment,
            storage,
            rate_limiter.clone(),
            Arc::new(ObjectNameMinter::new()),
        );

        Self {
            router,
            store,
            rate_limiter,
        }
    }

    pub async fn send_request(
        &self,
        request: Request<Body>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn send_post_request(
        &self,
        route: &str,
        payload: serde_json::Value,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        self.send_post_request_from(route, payload, None).await
    }

    /// POST with `X-Forwarded-For` set to `client_ip`
    pub async fn send_post_request_from(
        &self,
        route: &str,
        payload: serde_json::Value,
        client_ip: Option<&str>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let mut builder = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json");
        if let Some(client_ip) = client_ip {
            builder = builder.header("X-Forwarded-For", client_ip);
        }
        let request = builder.body(Body::from(payload.to_string()))?;
        self.send_request(request).await
    }

    pub async fn send_raw_post_request(
        &self,
        route: &str,
        body: impl Into<Body>,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("POST")
            .header("Content-Type", "application/json")
            .body(body.into())?;
        self.send_request(request).await
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        self.send_request(request).await
    }

    pub async fn send_options_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("OPTIONS")
            .header("Origin", "https://share.example.com")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())?;
        self.send_request(request).await
    }
}
