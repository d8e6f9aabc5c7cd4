use std::{sync::Arc, time::Duration};

use fileshare_backend::{
    rate_limit::{InMemoryRateLimiter, RateLimitPolicy},
    server,
    storage::StorageHandle,
    types::Environment,
};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();

    // Configure logging format based on environment
    // Use JSON format for staging/production (Datadog), regular format for development
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;
    let storage = StorageHandle::from_env(http_client);

    let policy = RateLimitPolicy::from_env();
    tracing::info!(
        max_requests = policy.max_requests,
        window_secs = policy.window.num_seconds(),
        "Rate limiting upload URL requests"
    );
    let rate_limiter = Arc::new(InMemoryRateLimiter::new(policy));

    server::start(environment, storage, rate_limiter).await
}
