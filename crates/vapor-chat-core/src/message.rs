//! Chat message types
//!
//! A [`ChatMessage`] is what a consumer keeps in its transcript: either text
//! the local user typed, or a line received from another participant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::codec::InboundFrame;

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// Typed by the local user
    Local,
    /// Received from the server on behalf of another participant
    Remote,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::Local => write!(f, "local"),
            Sender::Remote => write!(f, "remote"),
        }
    }
}

/// A single transcript entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the message
    pub sender: Sender,
    /// Display text
    pub content: String,
    /// When the message was authored, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Optional avatar or attachment reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
}

impl ChatMessage {
    /// Create a message typed by the local user
    pub fn local(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Local,
            content: content.into(),
            timestamp: None,
            image_ref: None,
        }
    }

    /// Create a message received from the server
    ///
    /// The content is rendered as `"<username>: <message>"`.
    pub fn remote(frame: &InboundFrame) -> Self {
        Self {
            sender: Sender::Remote,
            content: format!("{}: {}", frame.username, frame.message),
            timestamp: None,
            image_ref: None,
        }
    }

    /// Attach a timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attach an image reference
    pub fn with_image_ref(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_sender_display() {
        assert_eq!(Sender::Local.to_string(), "local");
        assert_eq!(Sender::Remote.to_string(), "remote");
    }

    #[test]
    fn test_remote_content_format() {
        let frame = InboundFrame {
            username: "bob".to_string(),
            message: "hi".to_string(),
        };
        let message = ChatMessage::remote(&frame);
        assert_eq!(message.sender, Sender::Remote);
        assert_eq!(message.content, "bob: hi");
        assert!(message.timestamp.is_none());
        assert!(message.image_ref.is_none());
    }

    #[test]
    fn test_local_message_serialization_skips_empty_fields() {
        let json = serde_json::to_string(&ChatMessage::local("hello")).unwrap();
        assert_eq!(json, r#"{"sender":"local","content":"hello"}"#);
    }

    #[test]
    fn test_builders() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let message = ChatMessage::local("look")
            .with_timestamp(at)
            .with_image_ref("avatars/alice.png");

        assert_eq!(message.timestamp, Some(at));
        assert_eq!(message.image_ref.as_deref(), Some("avatars/alice.png"));

        let parsed: ChatMessage =
            serde_json::from_str(&serde_json::to_string(&message).unwrap()).unwrap();
        assert_eq!(parsed, message);
    }
}
