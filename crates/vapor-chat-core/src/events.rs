//! Event Sink Trait
//!
//! This module provides the EventSink trait through which a
//! [`Session`](crate::session::Session) hands delivered messages and
//! disconnect notifications to its consumer (a UI controller, the CLI,
//! tests, etc.).

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::connection::DisconnectReason;
use crate::message::ChatMessage;

/// Receiver of session events
///
/// A session holds its sink weakly; dropping the sink simply stops delivery.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// A chat message arrived from another participant
    async fn deliver(&self, message: &ChatMessage) -> Result<(), String>;

    /// The connection ended; call `start()` again to reconnect
    async fn disconnected(&self, reason: &DisconnectReason) -> Result<(), String>;
}

/// No-op event sink for testing or headless use
#[derive(Default, Clone)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn deliver(&self, _message: &ChatMessage) -> Result<(), String> {
        Ok(())
    }

    async fn disconnected(&self, _reason: &DisconnectReason) -> Result<(), String> {
        Ok(())
    }
}

/// Stdout event sink for CLI mode - prints events to console
#[derive(Default, Clone)]
pub struct StdoutEventSink {
    /// Whether to print in JSON format
    pub json_output: bool,
}

impl StdoutEventSink {
    pub fn new(json_output: bool) -> Self {
        Self { json_output }
    }
}

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn deliver(&self, message: &ChatMessage) -> Result<(), String> {
        if self.json_output {
            let message_json = serde_json::to_string(message).map_err(|e| e.to_string())?;
            println!(r#"{{"event":"message","payload":{message_json}}}"#);
        } else {
            println!("{}", message.content);
        }
        Ok(())
    }

    async fn disconnected(&self, reason: &DisconnectReason) -> Result<(), String> {
        if self.json_output {
            let reason_json = serde_json::to_string(reason).map_err(|e| e.to_string())?;
            println!(r#"{{"event":"disconnected","reason":{reason_json}}}"#);
        } else {
            println!("Disconnected: {reason}");
        }
        Ok(())
    }
}

/// Event forwarded by [`ChannelEventSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Delivered(ChatMessage),
    Disconnected(DisconnectReason),
}

/// Event sink that forwards into an unbounded tokio channel
///
/// Handy when the consumer already runs its own event loop.
#[derive(Clone)]
pub struct ChannelEventSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelEventSink {
    /// Create a sink and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn forward(&self, event: SessionEvent) -> Result<(), String> {
        self.tx
            .send(event)
            .map_err(|_| "event receiver dropped".to_string())
    }
}

#[async_trait]
impl EventSink for ChannelEventSink {
    async fn deliver(&self, message: &ChatMessage) -> Result<(), String> {
        self.forward(SessionEvent::Delivered(message.clone()))
    }

    async fn disconnected(&self, reason: &DisconnectReason) -> Result<(), String> {
        self.forward(SessionEvent::Disconnected(reason.clone()))
    }
}
