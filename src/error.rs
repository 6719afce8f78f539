//! Error taxonomy for the Naivedyam client.
//!
//! Three families matter to the frontend: local validation failures
//! (surfaced inline, never sent to the server), remote failures (with
//! "session expired" split out so the shell can redirect to login), and
//! lookups of entities missing from the loaded data. Commands stringify
//! these at the IPC boundary; the pure calculators never construct them
//! for merely-missing optional fields.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Pre-submit validation failure, recovered locally.
    #[error("{0}")]
    Validation(String),

    /// The backend rejected the session (HTTP 401).
    #[error("Session expired. Please sign in again.")]
    Unauthenticated,

    /// Any other backend or network failure, already user-readable.
    #[error("{0}")]
    Remote(String),

    /// A referenced entity is absent from the loaded data.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl ClientError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ClientError::Validation(msg.into())
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        ClientError::Remote(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        ClientError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// True when the frontend should drop the session and show the login view.
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ClientError::Unauthenticated)
    }
}

/// Boundary conversion used by every `#[tauri::command]`.
impl From<ClientError> for String {
    fn from(err: ClientError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_the_entity() {
        let err = ClientError::not_found("Menu item", "itm-42");
        assert_eq!(err.to_string(), "Menu item not found: itm-42");
    }

    #[test]
    fn unauthenticated_is_distinguished() {
        assert!(ClientError::Unauthenticated.is_unauthenticated());
        assert!(!ClientError::validation("x").is_unauthenticated());
    }
}
