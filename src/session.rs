//! User session management.
//!
//! Credentials are verified server-side; the client keeps only the bearer
//! token (in the OS keyring, via `storage`) and the signed-in user's
//! profile in memory, used to pre-fill forms and gate protected views.
//! Password buffers are zeroized as soon as the request payload is built.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use tracing::{info, warn};
use zeroize::Zeroize;

use crate::api;
use crate::booking::is_valid_email;
use crate::error::ClientError;
use crate::storage;

const MIN_PASSWORD_LEN: usize = 6;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The signed-in user, as the backend reports it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Tauri managed state for the session.
pub struct SessionState {
    user: Mutex<Option<User>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            user: Mutex::new(None),
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.lock().unwrap().clone()
    }

    pub fn set_user(&self, user: User) {
        *self.user.lock().unwrap() = Some(user);
    }

    pub fn clear(&self) {
        *self.user.lock().unwrap() = None;
    }

    /// Contact details for pre-filling the booking wizard. Empty strings
    /// when signed out.
    pub fn profile(&self) -> (String, String, String) {
        match self.current_user() {
            Some(u) => (u.name, u.email, u.phone),
            None => (String::new(), String::new(), String::new()),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_login(email: &str, password: &str) -> Result<(), ClientError> {
    if !is_valid_email(email.trim()) {
        return Err(ClientError::validation("Please enter a valid email address"));
    }
    if password.is_empty() {
        return Err(ClientError::validation("Please enter your password"));
    }
    Ok(())
}

fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    confirm: Option<&str>,
) -> Result<(), ClientError> {
    if name.trim().is_empty() {
        return Err(ClientError::validation("Please enter your name"));
    }
    if !is_valid_email(email.trim()) {
        return Err(ClientError::validation("Please enter a valid email address"));
    }
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ClientError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if let Some(confirm) = confirm {
        if confirm != password {
            return Err(ClientError::validation("Passwords do not match"));
        }
    }
    Ok(())
}

fn user_from_response(resp: &Value) -> Result<User, ClientError> {
    let user_value = resp.get("user").unwrap_or(resp);
    serde_json::from_value(user_value.clone())
        .map_err(|e| ClientError::remote(format!("Malformed user in server response: {e}")))
}

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

/// Sign in. On success the token goes to the keyring and the user into
/// the session store.
pub async fn login(
    state: &SessionState,
    email: &str,
    mut password: String,
) -> Result<Value, ClientError> {
    validate_login(email, &password)?;

    let email = email.trim().to_string();
    let payload = serde_json::json!({ "email": email, "password": password });
    password.zeroize();

    let resp = api::post_json("/api/auth/login", payload).await?;

    let token = resp
        .get("token")
        .and_then(Value::as_str)
        .ok_or_else(|| ClientError::remote("Server response carried no session token"))?;
    storage::set_session_token(token).map_err(ClientError::remote)?;
    storage::remember_login_email(&email);

    let user = user_from_response(&resp)?;
    info!(user_id = %user.id, "login successful");
    let user_json = serde_json::to_value(&user).unwrap_or(Value::Null);
    state.set_user(user);

    Ok(serde_json::json!({ "success": true, "user": user_json }))
}

/// Create an account. Does not sign in; the frontend routes to login.
pub async fn register(
    name: &str,
    email: &str,
    mut password: String,
    mut confirm: Option<String>,
) -> Result<Value, ClientError> {
    validate_registration(name, email, &password, confirm.as_deref())?;

    let payload = serde_json::json!({
        "name": name.trim(),
        "email": email.trim(),
        "password": password,
    });
    password.zeroize();
    if let Some(c) = confirm.as_mut() {
        c.zeroize();
    }

    api::post_json("/api/auth/register", payload).await?;
    info!("registration submitted");
    Ok(serde_json::json!({ "success": true }))
}

/// Resolve the current session: the cached user, or the stored token
/// exchanged for a profile, or null. A token known to be expired is
/// dropped without a round trip.
pub async fn current_session(state: &SessionState) -> Result<Value, ClientError> {
    if let Some(user) = state.current_user() {
        return Ok(serde_json::to_value(user).unwrap_or(Value::Null));
    }

    let Some(token) = storage::session_token() else {
        return Ok(Value::Null);
    };
    if api::token_is_expired(&token) {
        info!("stored session token expired, clearing");
        storage::clear_session_token();
        return Ok(Value::Null);
    }

    match api::get_json("/api/auth/me").await {
        Ok(resp) => {
            let user = user_from_response(&resp)?;
            let user_json = serde_json::to_value(&user).unwrap_or(Value::Null);
            state.set_user(user);
            Ok(user_json)
        }
        Err(e) if e.is_unauthenticated() => {
            warn!("stored session token rejected by the server");
            storage::clear_session_token();
            state.clear();
            Ok(Value::Null)
        }
        Err(e) => Err(e),
    }
}

/// Sign out locally. The token is best-effort revoked server-side.
pub async fn logout(state: &SessionState) -> Value {
    if storage::session_token().is_some() {
        if let Err(e) = api::post_json("/api/auth/logout", serde_json::json!({})).await {
            warn!(error = %e, "server-side logout failed, clearing locally anyway");
        }
    }
    storage::clear_session_token();
    state.clear();
    info!("session cleared");
    serde_json::json!({ "success": true })
}

// ===========================================================================
// Tests
// ===========================================================================
