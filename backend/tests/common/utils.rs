use axum::response::Response;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use url::Url;

pub async fn parse_response_body(response: Response) -> serde_json::Value {
    let body = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    serde_json::from_slice(&body).expect("Failed to parse JSON")
}

pub fn create_upload_request(
    filename: &str,
    expiration_days: serde_json::Value,
) -> serde_json::Value {
    serde_json::json!({
        "filename": filename,
        "expirationDays": expiration_days,
        "contentType": "application/octet-stream",
        "fileSize": 1024
    })
}

/// Comma-separated header value as a lowercase list
pub fn header_list(response: &Response, name: &str) -> Vec<String> {
    response.headers()[name]
        .to_str()
        .expect("Non-ASCII header")
        .split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .collect()
}

/// Value of query parameter `name` in a signed URL
pub fn query_param(url: &str, name: &str) -> String {
    let url = Url::parse(url).expect("Invalid URL");
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .unwrap_or_else(|| panic!("Missing query parameter {name} in {url}"))
}

/// Expiry (`se`) of a signed URL
pub fn signed_expiry(url: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&query_param(url, "se"))
        .expect("Invalid se")
        .with_timezone(&Utc)
}

/// Asserts `actual` lies within `tolerance_secs` of `expected`
pub fn assert_close(actual: DateTime<Utc>, expected: DateTime<Utc>, tolerance_secs: i64) {
    let diff = (actual - expected).num_seconds().abs();
    assert!(
        diff <= tolerance_secs,
        "{actual} is {diff}s away from {expected}"
    );
}
