use std::{sync::Arc, time::Duration};

use aide::openapi::OpenApi;
use axum::{
    error_handling::HandleErrorLayer,
    http::{header, HeaderValue, StatusCode},
    middleware, BoxError, Extension, Router,
};
use datadog_tracing::axum::{shutdown_signal, OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tower::{timeout::error::Elapsed, ServiceBuilder};
use tower_http::{set_header::SetResponseHeaderLayer, trace::TraceLayer};

use crate::{
    middleware::add_response_headers,
    policy::ObjectNameMinter,
    rate_limit::RateLimiter,
    routes,
    storage::StorageHandle,
    types::{AppError, Environment},
};

/// Upper bound on the time spent answering one request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds the application router with all dependencies attached
pub fn app(
    environment: Environment,
    storage: StorageHandle,
    rate_limiter: Arc<dyn RateLimiter>,
    minter: Arc<ObjectNameMinter>,
) -> Router {
    let mut openapi = OpenApi::default();

    routes::handler(environment)
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(storage))
        .layer(Extension(rate_limiter))
        .layer(Extension(minter))
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .timeout(REQUEST_TIMEOUT),
        )
        .layer(TraceLayer::new_for_http())
        // Responses built outside the route CORS layers (429, timeouts,
        // health) still need the origin header for the browser to read them
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(middleware::from_fn(add_response_headers))
}

/// Converts errors from the timeout layer into the API error envelope
#[allow(clippy::unused_async)]
async fn handle_middleware_error(err: BoxError) -> AppError {
    if err.is::<Elapsed>() {
        AppError::new(
            StatusCode::REQUEST_TIMEOUT,
            "request_timeout",
            "Request timed out",
            true,
        )
    } else {
        AppError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Unhandled internal error",
            true,
        )
        .with_details(err.to_string())
    }
}

/// Starts the server with the given environment and dependencies
///
/// # Errors
///
/// Returns an error if the server fails to start or bind to the port
pub async fn start(
    environment: Environment,
    storage: StorageHandle,
    rate_limiter: Arc<dyn RateLimiter>,
) -> anyhow::Result<()> {
    let router = app(
        environment,
        storage,
        rate_limiter,
        Arc::new(ObjectNameMinter::new()),
    )
    // Include trace context as header into the response
    .layer(OtelInResponseLayer)
    // Start OpenTelemetry trace on incoming request
    .layer(OtelAxumLayer::default());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], environment.port()?));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 File Share Backend started on http://{addr}");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, response::IntoResponse, routing::get};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_elapsed_maps_to_timeout_envelope() {
        let response = handle_middleware_error(Box::new(Elapsed::new()))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["code"], "request_timeout");
        assert_eq!(body["error"], "Request timed out");
        assert_eq!(body["allowRetry"], true);
    }

    #[tokio::test]
    async fn test_slow_handler_times_out_with_json_body() {
        let router = Router::new()
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(handle_middleware_error))
                    .timeout(Duration::from_millis(20)),
            );

        let request = Request::builder().uri("/slow").body(Body::empty()).unwrap();
        let response = router.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(json_body(response).await["code"], "request_timeout");
    }
}
