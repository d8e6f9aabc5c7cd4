mod docs;
pub mod download;
pub mod health;
pub mod upload;

use aide::axum::{
    routing::{get, post},
    ApiRouter,
};
use axum::{
    http::{header, Method},
    middleware,
};
use tower_http::cors::{Any, CorsLayer};

use crate::{middleware::rate_limit_middleware, types::Environment};

/// Path of the upload URL endpoint
pub const UPLOAD_URL_PATH: &str = "/api/generateUploadUrl";

/// Path of the download URL endpoint
pub const DOWNLOAD_URL_PATH: &str = "/api/generateDownloadUrl";

/// CORS policy for a route group: any origin, JSON bodies, the given methods
fn cors_layer(methods: [Method; 2]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(methods)
        .allow_headers([header::CONTENT_TYPE])
}

/// Creates the router with all handler routes
pub fn handler(environment: Environment) -> ApiRouter {
    // Only the upload endpoint is rate limited. The limiter sits outside the
    // CORS layer so preflights are counted too.
    let upload = ApiRouter::new()
        .api_route(UPLOAD_URL_PATH, post(upload::create_upload_url))
        .layer(cors_layer([Method::POST, Method::OPTIONS]))
        .layer(middleware::from_fn(rate_limit_middleware));

    let download = ApiRouter::new()
        .api_route(DOWNLOAD_URL_PATH, get(download::create_download_url))
        .layer(cors_layer([Method::GET, Method::OPTIONS]));

    let router = ApiRouter::new()
        .merge(upload)
        .merge(download)
        .api_route("/health", get(health::handler));

    if environment.show_api_docs() {
        router.merge(docs::handler())
    } else {
        router
    }
}
