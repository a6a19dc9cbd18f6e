//! Error types shared across the Skylight contexts.
//!
//! Each domain gets a typed enum; `user_message()` returns a short,
//! non-technical line suitable for the panel status display. No error in
//! this system is fatal — every failure degrades to a visible UI state.

use thiserror::Error;

use crate::bus::TabId;

/// Persistent store errors (SQLite, value encoding).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store read failed: {0}")]
    ReadFailed(String),

    #[error("store write failed: {0}")]
    WriteFailed(String),

    #[error("stored value for '{key}' is malformed: {message}")]
    MalformedValue { key: String, message: String },
}

impl StoreError {
    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "Settings storage is unavailable.",
            StoreError::ReadFailed(_) => "Could not read saved settings.",
            StoreError::WriteFailed(_) => "Could not save settings.",
            StoreError::MalformedValue { .. } => "Saved settings look damaged.",
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::ReadFailed(err.to_string())
    }
}

/// Message-bus delivery errors.
///
/// Delivery is best-effort by design: senders are expected to discard
/// `NoReceiver` silently, since the store remains the durable source of
/// truth.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("no receiving end in tab {0}")]
    NoReceiver(TabId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_error_user_messages_are_short() {
        let errors = [
            StoreError::Unavailable("x".into()),
            StoreError::ReadFailed("x".into()),
            StoreError::WriteFailed("x".into()),
            StoreError::MalformedValue {
                key: "k".into(),
                message: "m".into(),
            },
        ];
        for err in errors {
            assert!(!err.user_message().is_empty());
            assert!(!err.user_message().contains("SQL"));
        }
    }

    #[test]
    fn malformed_value_names_the_key() {
        let err = StoreError::MalformedValue {
            key: "customLocation".into(),
            message: "invalid type".into(),
        };
        assert!(err.to_string().contains("customLocation"));
    }
}
