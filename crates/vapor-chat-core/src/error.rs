//! Error types for the chat core
//!
//! Every fallible operation on a [`Connection`](crate::connection::Connection)
//! or [`Session`](crate::session::Session) returns [`ChatError`]. Transport
//! failures are not errors here: they surface as a disconnect event instead.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Chat core error type
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum ChatError {
    /// A frame was sent while no connection is open
    #[error("Not connected")]
    NotConnected,

    /// `start()` was called before a username was set
    #[error("Username has not been set")]
    IdentityNotSet,

    /// `connect()` was called while a handshake or socket is already live
    #[error("Connection already established or in progress")]
    AlreadyConnected,

    /// `connect()` was called on a connection that has already closed
    #[error("Connection is closed; create a new one to reconnect")]
    ConnectionClosed,

    /// No async runtime is available to drive the socket
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ChatError>;

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(ChatError::NotConnected.to_string(), "Not connected");
        assert_eq!(
            ChatError::IdentityNotSet.to_string(),
            "Username has not been set"
        );
        assert_eq!(
            ChatError::Runtime("no reactor".to_string()).to_string(),
            "Runtime error: no reactor"
        );
    }

    #[test]
    fn test_error_serde() {
        let json = serde_json::to_string(&ChatError::NotConnected).unwrap();
        assert_eq!(json, r#"{"type":"NotConnected"}"#);

        let parsed: ChatError =
            serde_json::from_str(r#"{"type":"Runtime","message":"boom"}"#).unwrap();
        assert_eq!(parsed, ChatError::Runtime("boom".to_string()));
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<u8>("not a number").unwrap_err();
        assert!(matches!(ChatError::from(err), ChatError::Serialization(_)));
    }
}
