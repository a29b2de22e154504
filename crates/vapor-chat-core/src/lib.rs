//! Vapor Chat Core Library
//!
//! Transport core for a persistent-connection chat client. A consumer sets a
//! username, starts a [`Session`], and receives chat messages and disconnect
//! notifications through an [`EventSink`]. Nothing here depends on a UI.
//!
//! # Modules
//!
//! - [`codec`] - JSON wire frames (identity, chat) and tolerant decoding
//! - [`message`] - Transcript message types
//! - [`connection`] - One WebSocket connection attempt and its events
//! - [`session`] - Identity, connection ownership and event dispatch
//! - [`events`] - Event sink trait for decoupling from frontends
//! - [`config`] - Endpoint and timeout configuration
//! - [`error`] - Error types

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod message;
pub mod session;

// Re-export commonly used types
pub use codec::{decode, encode_chat, encode_identity, FrameError, InboundFrame};
pub use config::ChatConfig;
pub use connection::{Connection, ConnectionEvent, ConnectionState, DisconnectReason};
pub use error::{ChatError, Result};
pub use events::{ChannelEventSink, EventSink, NoOpEventSink, SessionEvent, StdoutEventSink};
pub use message::{ChatMessage, Sender};
pub use session::{Dispatch, Identity, Session};
