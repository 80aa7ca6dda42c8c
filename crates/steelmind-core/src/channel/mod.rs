//! Reconnecting pub/sub channel for the collaboration layer.
//!
//! The channel is a pure state machine over an abstract [`Transport`]: it
//! never spawns timers or threads. The owner feeds transport events in and
//! calls [`ReconnectingChannel::poll`] to fire scheduled reconnects, which
//! keeps the behavior deterministic under test.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use steelmind_core::channel::{ConnectionState, ReconnectingChannel, Transport};
//! use steelmind_core::error::ChannelError;
//!
//! struct Loopback(Vec<String>);
//!
//! impl Transport for Loopback {
//!     fn open(&mut self) -> Result<(), ChannelError> { Ok(()) }
//!     fn send(&mut self, text: &str) -> Result<(), ChannelError> {
//!         self.0.push(text.to_string());
//!         Ok(())
//!     }
//!     fn close(&mut self) {}
//! }
//!
//! let mut channel = ReconnectingChannel::new(Loopback(Vec::new()));
//! channel.connect().unwrap();
//! channel.handle_open();
//! assert_eq!(channel.state(), ConnectionState::Connected);
//! assert!(channel.send("user_join", json!({"name": "sazed"})));
//! ```

mod message;
mod reconnecting;

pub use message::ChannelMessage;
pub use reconnecting::{
    ChannelConfig, ConnectionState, Delivery, MessageHandler, PendingReconnect,
    ReconnectingChannel, Transport,
};
