//! WebSocket connection
//!
//! A [`Connection`] is one attempt at talking to the chat endpoint. It owns a
//! background task that performs the handshake and then shuttles frames
//! between the socket and two channels:
//!
//! - outbound text queued by [`Connection::send`]
//! - inbound [`ConnectionEvent`]s pulled with [`Connection::next_event`]
//!
//! A connection never retries. Once it reaches [`ConnectionState::Closed`] it
//! is spent, and reconnecting means building a new one.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, Once, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::config::ChatConfig;
use crate::error::{ChatError, Result};

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Constructed, `connect()` not called yet
    Idle,
    /// Handshake in progress
    Connecting,
    /// Socket is open; sending is allowed
    Open,
    /// Terminated for any reason; terminal
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Idle => write!(f, "idle"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

/// Why a connection ended
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DisconnectReason {
    /// The handshake was rejected or the endpoint was unreachable
    HandshakeFailed(String),
    /// The handshake did not finish within the configured timeout
    HandshakeTimeout,
    /// The server closed the socket
    RemoteClosed,
    /// A network or protocol error ended an open socket
    Transport(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::HandshakeFailed(e) => write!(f, "handshake failed: {e}"),
            DisconnectReason::HandshakeTimeout => write!(f, "handshake timed out"),
            DisconnectReason::RemoteClosed => write!(f, "closed by server"),
            DisconnectReason::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

/// Lifecycle event raised by a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake completed
    Open,
    /// One inbound text frame
    Text(String),
    /// The socket ended; delivered once, and last
    Closed(DisconnectReason),
}

type SharedState = Arc<Mutex<ConnectionState>>;

/// Install rustls' ring provider as the process default, once
///
/// `wss://` handshakes need a process-level provider; an application that
/// already installed its own keeps it.
fn install_crypto_provider() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            debug!("TLS crypto provider already installed");
        }
    });
}

fn read_state(state: &SharedState) -> ConnectionState {
    *state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_state(state: &SharedState, next: ConnectionState) {
    *state.lock().unwrap_or_else(PoisonError::into_inner) = next;
}

/// One WebSocket connection attempt
pub struct Connection {
    server_url: String,
    handshake_timeout: Duration,
    state: SharedState,
    outbound: Option<mpsc::UnboundedSender<String>>,
    events: Option<mpsc::UnboundedReceiver<ConnectionEvent>>,
    task: Option<JoinHandle<()>>,
    terminated: bool,
}

impl Connection {
    /// Create an idle connection for the configured endpoint
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            server_url: config.server_url.clone(),
            handshake_timeout: config.handshake_timeout,
            state: Arc::new(Mutex::new(ConnectionState::Idle)),
            outbound: None,
            events: None,
            task: None,
            terminated: false,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        read_state(&self.state)
    }

    /// Whether the final event has been consumed (or the owner closed it)
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Start the handshake in the background
    ///
    /// Must be called from within a tokio runtime. Returns immediately; the
    /// outcome arrives as [`ConnectionEvent::Open`] or
    /// [`ConnectionEvent::Closed`].
    pub fn connect(&mut self) -> Result<()> {
        match self.state() {
            ConnectionState::Idle => {}
            ConnectionState::Connecting | ConnectionState::Open => {
                return Err(ChatError::AlreadyConnected)
            }
            ConnectionState::Closed => return Err(ChatError::ConnectionClosed),
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| ChatError::Runtime(e.to_string()))?;
        install_crypto_provider();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        write_state(&self.state, ConnectionState::Connecting);
        info!("Connecting to {}", self.server_url);

        let socket = SocketTask {
            server_url: self.server_url.clone(),
            handshake_timeout: self.handshake_timeout,
            state: self.state.clone(),
            events: events_tx,
        };
        self.task = Some(runtime.spawn(socket.run(outbound_rx)));
        self.outbound = Some(outbound_tx);
        self.events = Some(events_rx);
        Ok(())
    }

    /// Queue one outbound text frame
    ///
    /// Fails with [`ChatError::NotConnected`] unless the connection is open.
    pub fn send(&self, text: impl Into<String>) -> Result<()> {
        if self.state() != ConnectionState::Open {
            return Err(ChatError::NotConnected);
        }
        let outbound = self.outbound.as_ref().ok_or(ChatError::NotConnected)?;
        outbound
            .send(text.into())
            .map_err(|_| ChatError::NotConnected)
    }

    /// Close the connection and release the socket
    ///
    /// Idempotent. Once this returns, [`Connection::next_event`] yields
    /// nothing further, even if the handshake was still in flight.
    pub fn close(&mut self) {
        if self.state() != ConnectionState::Closed {
            debug!("Closing connection to {}", self.server_url);
        }
        write_state(&self.state, ConnectionState::Closed);
        self.outbound = None;
        self.events = None;
        self.terminated = true;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Wait for the next lifecycle event
    ///
    /// Returns `None` when the connection never started, was closed by its
    /// owner, or has already delivered [`ConnectionEvent::Closed`].
    /// Cancel safe.
    pub async fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.terminated {
            return None;
        }
        let events = self.events.as_mut()?;

        match events.recv().await {
            Some(ConnectionEvent::Closed(reason)) => {
                self.finish();
                Some(ConnectionEvent::Closed(reason))
            }
            Some(event) => Some(event),
            None => {
                // The socket task ended without reporting; keep the contract.
                warn!("Connection task for {} ended unexpectedly", self.server_url);
                self.finish();
                Some(ConnectionEvent::Closed(DisconnectReason::Transport(
                    "connection task ended unexpectedly".to_string(),
                )))
            }
        }
    }

    fn finish(&mut self) {
        write_state(&self.state, ConnectionState::Closed);
        self.terminated = true;
        self.outbound = None;
        self.events = None;
        self.task = None;
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("server_url", &self.server_url)
            .field("state", &self.state())
            .finish()
    }
}

/// Background half of a connection: handshake, then pump frames
struct SocketTask {
    server_url: String,
    handshake_timeout: Duration,
    state: SharedState,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

impl SocketTask {
    async fn run(self, mut outbound: mpsc::UnboundedReceiver<String>) {
        let handshake =
            tokio::time::timeout(self.handshake_timeout, connect_async(self.server_url.as_str()))
                .await;

        let socket = match handshake {
            Ok(Ok((socket, _response))) => socket,
            Ok(Err(e)) => {
                warn!("Failed to connect to {}: {}", self.server_url, e);
                self.finish(DisconnectReason::HandshakeFailed(e.to_string()));
                return;
            }
            Err(_) => {
                warn!(
                    "Handshake with {} timed out after {:?}",
                    self.server_url, self.handshake_timeout
                );
                self.finish(DisconnectReason::HandshakeTimeout);
                return;
            }
        };

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != ConnectionState::Connecting {
                // Closed by the owner while the handshake was in flight.
                return;
            }
            *state = ConnectionState::Open;
        }
        info!("Connected to {}", self.server_url);
        let _ = self.events.send(ConnectionEvent::Open);

        let (mut write, mut read) = socket.split();

        let reason = loop {
            tokio::select! {
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received frame ({} bytes)", text.len());
                        let _ = self.events.send(ConnectionEvent::Text(text));
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data) {
                        Ok(text) => {
                            debug!("Received binary frame as text ({} bytes)", text.len());
                            let _ = self.events.send(ConnectionEvent::Text(text));
                        }
                        Err(_) => debug!("Ignoring non-UTF-8 binary frame"),
                    },
                    Some(Ok(Message::Close(_))) => break DisconnectReason::RemoteClosed,
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        // Pongs are queued by tungstenite
                    }
                    Some(Ok(Message::Frame(_))) => {}
                    Some(Err(e)) => break DisconnectReason::Transport(e.to_string()),
                    None => break DisconnectReason::RemoteClosed,
                },
                text = outbound.recv() => match text {
                    Some(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            break DisconnectReason::Transport(e.to_string());
                        }
                    }
                    // The owning Connection was closed or dropped.
                    None => {
                        let _ = write.close().await;
                        return;
                    }
                },
            }
        };

        let _ = write.close().await;
        info!("Disconnected from {}: {}", self.server_url, reason);
        self.finish(reason);
    }

    fn finish(&self, reason: DisconnectReason) {
        write_state(&self.state, ConnectionState::Closed);
        let _ = self.events.send(ConnectionEvent::Closed(reason));
    }
}
