use std::collections::HashMap;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{api, storage, APP_START_EPOCH};

/// One in-flight load per view. Starting a new load cancels the token
/// of the previous one, so a response that raced a newer request can be
/// recognized and dropped instead of overwriting fresher data.
#[derive(Default)]
pub struct ViewState {
    tokens: Mutex<HashMap<&'static str, CancellationToken>>,
}

impl ViewState {
    pub fn begin(&self, view: &'static str) -> CancellationToken {
        let mut tokens = self.tokens.lock().unwrap();
        if let Some(previous) = tokens.get(view) {
            previous.cancel();
        }
        let token = CancellationToken::new();
        tokens.insert(view, token.clone());
        token
    }
}

#[tauri::command]
pub async fn app_get_version() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") }))
}

#[tauri::command]
pub async fn system_get_info() -> Result<serde_json::Value, String> {
    let start = APP_START_EPOCH.load(std::sync::atomic::Ordering::Relaxed);
    let uptime = if start > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        now.saturating_sub(start)
    } else {
        0
    };

    Ok(serde_json::json!({
        "platform": std::env::consts::OS,
        "arch": std::env::consts::ARCH,
        "version": env!("CARGO_PKG_VERSION"),
        "build_timestamp": env!("BUILD_TIMESTAMP"),
        "build_git_sha": env!("BUILD_GIT_SHA"),
        "is_configured": storage::is_configured(),
        "uptime_seconds": uptime,
    }))
}

// -- Backend connection ------------------------------------------------------

#[tauri::command]
pub async fn settings_is_configured() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "configured": storage::is_configured() }))
}

#[tauri::command]
pub async fn settings_get_backend_url() -> Result<serde_json::Value, String> {
    Ok(serde_json::json!({ "url": storage::backend_url() }))
}

#[tauri::command]
pub async fn settings_set_backend_url(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let url = super::payload_arg0_as_string(arg0, &["url", "backendUrl", "backend_url"])
        .ok_or("Missing backend URL")?;
    storage::set_backend_url(&url)?;
    info!("backend URL updated");
    Ok(serde_json::json!({ "success": true, "url": storage::backend_url() }))
}

/// Probe the backend health endpoint, against either the given URL or
/// the stored one.
#[tauri::command]
pub async fn settings_test_connection(
    arg0: Option<serde_json::Value>,
) -> Result<serde_json::Value, String> {
    let url = super::payload_arg0_as_string(arg0, &["url", "backendUrl", "backend_url"])
        .or_else(storage::backend_url)
        .ok_or("No backend URL configured")?;
    let result = api::test_connectivity(&url).await;
    serde_json::to_value(result).map_err(|e| e.to_string())
}

/// Forget the backend URL, the session token, and the remembered email.
#[tauri::command]
pub async fn settings_clear_connection() -> Result<serde_json::Value, String> {
    storage::clear_all()?;
    info!("stored credentials cleared");
    Ok(serde_json::json!({ "success": true }))
}

// ===========================================================================
// Tests
// ===========================================================================
