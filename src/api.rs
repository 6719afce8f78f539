//! Naivedyam backend API client.
//!
//! Provides authenticated HTTP communication with the backend: catalog and
//! hotel fetches, cart mutations, order placement, bookings, and auth.
//! Every failure is mapped to a user-readable `ClientError`; HTTP 401 is
//! split out as `Unauthenticated` so the shell can redirect to login.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::info;

use crate::error::ClientError;
use crate::storage;

/// Default timeout for API requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout used specifically for the lightweight connectivity test.
const CONNECTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// URL normalisation
// ---------------------------------------------------------------------------

/// Normalise the backend base URL:
/// - strip trailing slashes
/// - strip a trailing `/api` segment
/// - ensure a scheme is present (https, or http for localhost)
pub fn normalize_backend_url(url: &str) -> String {
    let mut url = url.trim().to_string();

    // Ensure scheme
    if !url.starts_with("http://") && !url.starts_with("https://") {
        if url.starts_with("localhost") || url.starts_with("127.0.0.1") {
            url = format!("http://{url}");
        } else {
            url = format!("https://{url}");
        }
    }

    // Strip trailing slashes
    while url.ends_with('/') {
        url.pop();
    }

    // Strip trailing /api
    if url.ends_with("/api") {
        url.truncate(url.len() - 4);
    }

    // Strip trailing slashes again (in case "/api/" was present)
    while url.ends_with('/') {
        url.pop();
    }

    url
}

// ---------------------------------------------------------------------------
// Session token inspection
// ---------------------------------------------------------------------------

/// Peek at the `exp` claim of a JWT without verifying it. Verification is
/// the backend's job; this only lets the client skip a round trip for a
/// token it already knows is dead.
pub fn token_expires_at(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim()).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp").and_then(Value::as_i64)?;
    Utc.timestamp_opt(exp, 0).single()
}

/// True when the token carries an `exp` claim that is already in the past.
/// Tokens without a readable `exp` are given to the server to judge.
pub fn token_is_expired(token: &str) -> bool {
    match token_expires_at(token) {
        Some(exp) => exp <= Utc::now(),
        None => false,
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a user-friendly message.
fn friendly_error(url: &str, err: &reqwest::Error) -> ClientError {
    if err.is_connect() {
        return ClientError::remote(format!("Cannot reach the Naivedyam server at {url}"));
    }
    if err.is_timeout() {
        return ClientError::remote(format!("Connection to {url} timed out"));
    }
    if err.is_builder() {
        return ClientError::remote(format!("Invalid backend URL: {url}"));
    }
    ClientError::remote(format!("Network error communicating with {url}: {err}"))
}

/// Convert an HTTP status code into a user-friendly message.
fn status_error(status: StatusCode) -> String {
    match status.as_u16() {
        403 => "You are not allowed to perform this action".to_string(),
        404 => "The requested resource was not found on the server".to_string(),
        s if s >= 500 => format!("Naivedyam server error (HTTP {s})"),
        s => format!("Unexpected response from the server (HTTP {s})"),
    }
}

// ---------------------------------------------------------------------------
// Connectivity test
// ---------------------------------------------------------------------------

/// Result of a connectivity test.
#[derive(serde::Serialize)]
pub struct ConnectivityResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Test connectivity to the backend with a lightweight health-check.
pub async fn test_connectivity(backend_url: &str) -> ConnectivityResult {
    let url = normalize_backend_url(backend_url);
    let health_url = format!("{url}/api/health");

    let client = match Client::builder().timeout(CONNECTIVITY_TIMEOUT).build() {
        Ok(c) => c,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(format!("Failed to create HTTP client: {e}")),
            };
        }
    };

    let start = Instant::now();

    let resp = match client.get(&health_url).send().await {
        Ok(r) => r,
        Err(e) => {
            return ConnectivityResult {
                success: false,
                latency_ms: None,
                error: Some(friendly_error(&url, &e).to_string()),
            };
        }
    };

    let latency = start.elapsed().as_millis() as u64;
    let status = resp.status();

    if status.is_success() {
        info!(latency_ms = latency, "connectivity test passed");
        ConnectivityResult {
            success: true,
            latency_ms: Some(latency),
            error: None,
        }
    } else {
        ConnectivityResult {
            success: false,
            latency_ms: Some(latency),
            error: Some(status_error(status)),
        }
    }
}

// ---------------------------------------------------------------------------
// Generic backend fetch
// ---------------------------------------------------------------------------

/// Perform an HTTP request against the configured backend.
///
/// `path` should include the leading slash, e.g. `/api/catalog`. The stored
/// session token, when present, is attached as a bearer header; endpoints
/// that do not require auth simply ignore it.
pub async fn fetch_from_backend(
    path: &str,
    method: Method,
    body: Option<Value>,
) -> Result<Value, ClientError> {
    let base = storage::backend_url()
        .map(|u| normalize_backend_url(&u))
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ClientError::remote("Client not configured: missing backend URL"))?;
    let full_url = format!("{base}{path}");

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .build()
        .map_err(|e| ClientError::remote(format!("Failed to create HTTP client: {e}")))?;

    let mut req = client
        .request(method, &full_url)
        .header("Content-Type", "application/json");

    if let Some(token) = storage::session_token() {
        req = req.bearer_auth(token.trim());
    }

    if let Some(b) = body {
        req = req.json(&b);
    }

    let resp = req.send().await.map_err(|e| friendly_error(&base, &e))?;
    let status = resp.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthenticated);
    }

    if !status.is_success() {
        // Prefer the backend's own error message when it sends one.
        let body_text = resp.text().await.unwrap_or_default();
        let detail = if let Ok(json) = serde_json::from_str::<Value>(&body_text) {
            json.get("error")
                .or_else(|| json.get("message"))
                .and_then(Value::as_str)
                .map(|s| s.to_string())
                .unwrap_or_else(|| status_error(status))
        } else if !body_text.trim().is_empty() {
            format!("{} : {}", status_error(status), body_text.trim())
        } else {
            status_error(status)
        };
        return Err(ClientError::remote(detail));
    }

    // Return the JSON body, or null for empty 204 responses.
    let body_text = resp.text().await.unwrap_or_default();
    if body_text.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&body_text)
        .map_err(|e| ClientError::remote(format!("Invalid JSON from the server: {e}")))
}

/// Shorthand for authenticated GETs.
pub async fn get_json(path: &str) -> Result<Value, ClientError> {
    fetch_from_backend(path, Method::GET, None).await
}

/// Shorthand for authenticated POSTs.
pub async fn post_json(path: &str, body: Value) -> Result<Value, ClientError> {
    fetch_from_backend(path, Method::POST, Some(body)).await
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_adds_https_scheme() {
        assert_eq!(
            normalize_backend_url("api.naivedyam.app"),
            "https://api.naivedyam.app"
        );
    }

    #[test]
    fn normalize_uses_http_for_localhost() {
        assert_eq!(
            normalize_backend_url("localhost:5000"),
            "http://localhost:5000"
        );
        assert_eq!(
            normalize_backend_url("127.0.0.1:5000"),
            "http://127.0.0.1:5000"
        );
    }

    #[test]
    fn normalize_strips_trailing_slash_and_api_suffix() {
        assert_eq!(
            normalize_backend_url("https://api.naivedyam.app/api/"),
            "https://api.naivedyam.app"
        );
        assert_eq!(
            normalize_backend_url("https://api.naivedyam.app///"),
            "https://api.naivedyam.app"
        );
    }

    #[test]
    fn token_expiry_peek_reads_exp_claim() {
        // {"alg":"none"} . {"sub":"u1","exp":4102444800}  (2100-01-01)
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"u1\",\"exp\":4102444800}");
        let token = format!("{header}.{payload}.sig");

        let exp = token_expires_at(&token).expect("exp claim");
        assert_eq!(exp.timestamp(), 4_102_444_800);
        assert!(!token_is_expired(&token));
    }

    #[test]
    fn expired_token_is_detected() {
        let header = URL_SAFE_NO_PAD.encode(b"{\"alg\":\"none\"}");
        let payload = URL_SAFE_NO_PAD.encode(b"{\"sub\":\"u1\",\"exp\":946684800}");
        let token = format!("{header}.{payload}.sig");
        assert!(token_is_expired(&token));
    }

    #[test]
    fn malformed_token_is_left_to_the_server() {
        assert!(token_expires_at("not-a-jwt").is_none());
        assert!(!token_is_expired("not-a-jwt"));
    }
}
