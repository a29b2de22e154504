//! Chat client configuration
//!
//! [`ChatConfig`] carries the endpoint and timing knobs a
//! [`Session`](crate::session::Session) needs. Defaults live in
//! [`defaults`] so frontends can reuse them (e.g. as CLI default values).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default configuration values
pub mod defaults {
    /// Default chat endpoint
    pub const DEFAULT_SERVER_URL: &str = "wss://vapor-chat.herokuapp.com/chat";

    /// Default time allowed for the WebSocket handshake (seconds)
    pub const DEFAULT_HANDSHAKE_TIMEOUT_SECS: u64 = 10;
}

/// Chat client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// WebSocket endpoint, `ws://` or `wss://`
    pub server_url: String,

    /// Handshake deadline; expiry counts as a disconnect
    pub handshake_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server_url: defaults::DEFAULT_SERVER_URL.to_string(),
            handshake_timeout: Duration::from_secs(defaults::DEFAULT_HANDSHAKE_TIMEOUT_SECS),
        }
    }
}

impl ChatConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for the `/chat` endpoint on `host` over TLS
    pub fn for_host(host: &str) -> Self {
        Self::default().with_server_url(format!("wss://{host}/chat"))
    }

    /// Builder method for the endpoint URL
    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = server_url.into();
        self
    }

    /// Builder method for the handshake timeout
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ChatConfig::new();
        assert_eq!(config.server_url, "wss://vapor-chat.herokuapp.com/chat");
        assert_eq!(config.handshake_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_for_host() {
        let config = ChatConfig::for_host("chat.example.org");
        assert_eq!(config.server_url, "wss://chat.example.org/chat");
    }

    #[test]
    fn test_builder() {
        let config = ChatConfig::new()
            .with_server_url("ws://127.0.0.1:9000/chat")
            .with_handshake_timeout(Duration::from_millis(250));
        assert_eq!(config.server_url, "ws://127.0.0.1:9000/chat");
        assert_eq!(config.handshake_timeout, Duration::from_millis(250));
    }
}
