//! Secure client config storage using the OS credential store.
//!
//! On Windows this uses DPAPI (via the `keyring` crate), on macOS Keychain,
//! and on Linux the Secret Service API. Holds the backend base URL, the
//! session bearer token, and the last signed-in email used to pre-fill the
//! login form. Nothing else is persisted client-side.

use keyring::Entry;
use tracing::{info, warn};

const SERVICE_NAME: &str = "naivedyam-client";

// Credential keys
pub const KEY_BACKEND_URL: &str = "backend_url";
pub const KEY_SESSION_TOKEN: &str = "session_token";
pub const KEY_LAST_LOGIN_EMAIL: &str = "last_login_email";

/// All credential keys managed by this module.
const ALL_KEYS: &[&str] = &[KEY_BACKEND_URL, KEY_SESSION_TOKEN, KEY_LAST_LOGIN_EMAIL];

// ---------------------------------------------------------------------------
// Low-level helpers
// ---------------------------------------------------------------------------

/// Retrieve a single credential from the OS keyring. Returns `None` when the
/// entry does not exist (or the platform returns a "not found" error).
pub fn get_credential(key: &str) -> Option<String> {
    let entry = match Entry::new(SERVICE_NAME, key) {
        Ok(e) => e,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to create entry");
            return None;
        }
    };
    match entry.get_password() {
        Ok(pw) => Some(pw),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key, error = %e, "keyring: failed to read credential");
            None
        }
    }
}

/// Store a credential in the OS keyring.
pub fn set_credential(key: &str, value: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    entry.set_password(value).map_err(|e| e.to_string())?;
    Ok(())
}

/// Delete a credential from the OS keyring. Silently succeeds if the entry
/// does not exist.
pub fn delete_credential(key: &str) -> Result<(), String> {
    let entry = Entry::new(SERVICE_NAME, key).map_err(|e| e.to_string())?;
    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()),
        Err(e) => Err(e.to_string()),
    }
}

pub fn has_credential(key: &str) -> bool {
    get_credential(key).is_some()
}

// ---------------------------------------------------------------------------
// High-level API
// ---------------------------------------------------------------------------

/// The client is considered configured once a backend URL is stored.
pub fn is_configured() -> bool {
    has_credential(KEY_BACKEND_URL)
}

/// Backend base URL, already normalized at store time.
pub fn backend_url() -> Option<String> {
    get_credential(KEY_BACKEND_URL)
}

pub fn set_backend_url(url: &str) -> Result<(), String> {
    let normalized = crate::api::normalize_backend_url(url);
    if normalized.trim().is_empty() {
        return Err("Backend URL must not be empty".into());
    }
    set_credential(KEY_BACKEND_URL, &normalized)?;
    info!(url = %normalized, "backend URL updated");
    Ok(())
}

/// Current session bearer token, if any.
pub fn session_token() -> Option<String> {
    get_credential(KEY_SESSION_TOKEN).filter(|t| !t.trim().is_empty())
}

pub fn set_session_token(token: &str) -> Result<(), String> {
    set_credential(KEY_SESSION_TOKEN, token.trim())
}

/// Drop the stored session token (logout or 401 from the backend).
pub fn clear_session_token() {
    if let Err(e) = delete_credential(KEY_SESSION_TOKEN) {
        warn!(error = %e, "keyring: failed to clear session token");
    }
}

pub fn last_login_email() -> Option<String> {
    get_credential(KEY_LAST_LOGIN_EMAIL)
}

pub fn remember_login_email(email: &str) {
    let _ = set_credential(KEY_LAST_LOGIN_EMAIL, email.trim());
}

/// Delete every stored credential (sign-out-everywhere / reset).
pub fn clear_all() -> Result<(), String> {
    info!("clearing all stored client credentials");
    for key in ALL_KEYS {
        delete_credential(key)?;
    }
    Ok(())
}
