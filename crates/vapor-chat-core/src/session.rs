//! Chat session
//!
//! [`Session`] is the object a consumer holds. It pairs an [`Identity`] with
//! at most one live [`Connection`], announces the identity when the socket
//! opens, decodes inbound frames into [`ChatMessage`]s for the
//! [`EventSink`], and reports disconnects. It never reconnects on its own:
//! after [`Dispatch::Disconnected`] the consumer decides whether to call
//! [`Session::start`] again.
//!
//! Events are processed by awaiting [`Session::dispatch_next`], typically in
//! a `tokio::select!` loop next to the consumer's input source.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

use crate::codec;
use crate::config::ChatConfig;
use crate::connection::{Connection, ConnectionEvent, ConnectionState, DisconnectReason};
use crate::error::{ChatError, Result};
use crate::events::EventSink;
use crate::message::ChatMessage;

/// Display name announced to the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Identity {
    /// No username chosen yet
    #[default]
    Unset,
    /// Username to announce on connect
    Set(String),
}

impl Identity {
    /// The username, if one has been set
    pub fn username(&self) -> Option<&str> {
        match self {
            Identity::Unset => None,
            Identity::Set(name) => Some(name),
        }
    }
}

/// Outcome of one [`Session::dispatch_next`] step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// The socket opened and the identity frame was queued
    Announced,
    /// The socket opened but the identity frame could not be sent
    Opened,
    /// A chat message was handed to the event sink
    Delivered(ChatMessage),
    /// An inbound frame was malformed and ignored
    Dropped,
    /// The connection ended and the event sink was notified
    Disconnected(DisconnectReason),
    /// No live connection to wait on
    Idle,
}

/// A chat participant's session
pub struct Session {
    config: ChatConfig,
    identity: Identity,
    connection: Option<Connection>,
    announced: bool,
    sink: Weak<dyn EventSink>,
}

impl Session {
    /// Create a session that reports to `sink`
    ///
    /// Only a weak reference to the sink is kept.
    pub fn new<S: EventSink + 'static>(config: ChatConfig, sink: &Arc<S>) -> Self {
        let sink: Arc<dyn EventSink> = sink.clone();
        Self {
            config,
            identity: Identity::Unset,
            connection: None,
            announced: false,
            sink: Arc::downgrade(&sink),
        }
    }

    /// Current identity
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Set the username announced on the next `start()`
    pub fn set_username(&mut self, name: impl Into<String>) {
        self.identity = Identity::Set(name.into());
    }

    /// State of the current connection (`Idle` before the first start)
    pub fn state(&self) -> ConnectionState {
        self.connection
            .as_ref()
            .map(Connection::state)
            .unwrap_or(ConnectionState::Idle)
    }

    /// Whether there are connection events left to dispatch
    pub fn is_active(&self) -> bool {
        self.connection
            .as_ref()
            .map(|c| !c.is_terminated())
            .unwrap_or(false)
    }

    /// Open a fresh connection, replacing any previous one
    ///
    /// Fails with [`ChatError::IdentityNotSet`] before a username is set, in
    /// which case no connection is attempted.
    pub fn start(&mut self) -> Result<()> {
        let username = self
            .identity
            .username()
            .ok_or(ChatError::IdentityNotSet)?;

        if let Some(mut previous) = self.connection.take() {
            previous.close();
        }
        self.announced = false;

        let mut connection = Connection::new(&self.config);
        connection.connect()?;
        info!("Starting chat session as {}", username);
        self.connection = Some(connection);
        Ok(())
    }

    /// Send a chat message on the open connection
    ///
    /// Returns the locally-authored message for the consumer's transcript.
    pub fn send_message(&self, text: &str) -> Result<ChatMessage> {
        let connection = self.connection.as_ref().ok_or(ChatError::NotConnected)?;
        if !self.announced {
            return Err(ChatError::NotConnected);
        }
        connection.send(codec::encode_chat(text)?)?;
        Ok(ChatMessage::local(text))
    }

    /// Close the current connection without notifying the sink
    pub fn close(&mut self) {
        if let Some(connection) = self.connection.as_mut() {
            connection.close();
        }
        self.announced = false;
    }

    /// Wait for the next connection event and handle it
    ///
    /// Waiting is cancel safe; once an event has been received the sink call
    /// runs to completion only if this future is polled to the end.
    pub async fn dispatch_next(&mut self) -> Dispatch {
        let Some(connection) = self.connection.as_mut() else {
            return Dispatch::Idle;
        };
        let Some(event) = connection.next_event().await else {
            return Dispatch::Idle;
        };

        match event {
            ConnectionEvent::Open => self.announce(),
            ConnectionEvent::Text(payload) => match codec::decode(payload.as_bytes()) {
                Some(frame) => {
                    let message = ChatMessage::remote(&frame);
                    self.deliver(&message).await;
                    Dispatch::Delivered(message)
                }
                None => Dispatch::Dropped,
            },
            ConnectionEvent::Closed(reason) => {
                self.announced = false;
                self.notify_disconnected(&reason).await;
                Dispatch::Disconnected(reason)
            }
        }
    }

    fn announce(&mut self) -> Dispatch {
        let (Some(connection), Some(username)) =
            (self.connection.as_ref(), self.identity.username())
        else {
            warn!("Connection opened without a username; not announcing");
            return Dispatch::Opened;
        };

        match codec::encode_identity(username).and_then(|frame| connection.send(frame)) {
            Ok(()) => {
                debug!("Announced identity {}", username);
                self.announced = true;
                Dispatch::Announced
            }
            Err(e) => {
                warn!("Failed to announce identity: {}", e);
                Dispatch::Opened
            }
        }
    }

    async fn deliver(&self, message: &ChatMessage) {
        let Some(sink) = self.sink.upgrade() else {
            debug!("Event sink dropped; not delivering message");
            return;
        };
        if let Err(e) = sink.deliver(message).await {
            warn!("Failed to deliver message: {}", e);
        }
    }

    async fn notify_disconnected(&self, reason: &DisconnectReason) {
        let Some(sink) = self.sink.upgrade() else {
            debug!("Event sink dropped; not reporting disconnect");
            return;
        };
        if let Err(e) = sink.disconnected(reason).await {
            warn!("Failed to emit disconnect: {}", e);
        }
    }
}
