//! Connection state machine with bounded linear-backoff reconnects.

use super::message::ChannelMessage;
use crate::config::{MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY};
use crate::error::ChannelError;
use instant::Instant;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The underlying bidirectional pipe.
///
/// Opening is asynchronous from the channel's point of view: `open` only
/// starts the attempt, and the owner later reports the outcome through
/// [`ReconnectingChannel::handle_open`], [`ReconnectingChannel::handle_close`]
/// or [`ReconnectingChannel::handle_error`].
pub trait Transport {
    /// Start opening the connection.
    #[must_use = "Open failures should be handled"]
    fn open(&mut self) -> Result<(), ChannelError>;

    /// Transmit one encoded message.
    #[must_use = "Send failures should be handled"]
    fn send(&mut self, text: &str) -> Result<(), ChannelError>;

    /// Close the connection. Must be safe to call when already closed.
    fn close(&mut self);
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Attempt `n` is scheduled `n * base_delay` after the connection drops
    pub base_delay: Duration,
    /// Consecutive failures tolerated before reconnecting stops
    pub max_attempts: u32,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            base_delay: RECONNECT_BASE_DELAY,
            max_attempts: MAX_RECONNECT_ATTEMPTS,
        }
    }
}

/// A scheduled reconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingReconnect {
    /// 1-based attempt number
    pub attempt: u32,
    pub delay: Duration,
    /// When [`ReconnectingChannel::poll`] will fire it
    pub due: Instant,
}

/// How an incoming message was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Passed to a handler registered with `on_message`
    Handler,
    /// Logged by the built-in handler for its type
    BuiltIn,
    /// No handler of any kind; logged generically
    Unhandled,
    /// Not a valid channel message; logged and dropped
    Malformed,
}

/// Callback for one message type.
pub type MessageHandler = Box<dyn FnMut(&Value) + Send>;

/// Pub/sub channel that reconnects on its own after the connection drops.
///
/// The owner drives it: lifecycle events from the transport are fed in
/// through the `handle_*` methods, and [`poll`](Self::poll) fires a scheduled
/// reconnect once its deadline has passed.
///
/// # State machine
///
/// ```text
///               connect()                handle_open()
/// Disconnected ──────────▶ Connecting ──────────────▶ Connected
///      ▲                        │                         │
///      └────────────────────────┴─────────────────────────┘
///              handle_close() / handle_error() / disconnect()
/// ```
///
/// Losing a connecting or connected transport schedules reconnect attempt
/// `n` after `n * base_delay`, up to `max_attempts` consecutive attempts. A
/// successful open resets the count. After the last attempt fails, only an
/// explicit [`connect`](Self::connect) tries again.
pub struct ReconnectingChannel<T: Transport> {
    transport: T,
    config: ChannelConfig,
    state: ConnectionState,
    attempts: u32,
    pending: Option<PendingReconnect>,
    handlers: HashMap<String, MessageHandler>,
}

impl<T: Transport> ReconnectingChannel<T> {
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ChannelConfig::default())
    }

    pub fn with_config(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            config,
            state: ConnectionState::Disconnected,
            attempts: 0,
            pending: None,
            handlers: HashMap::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Consecutive reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.attempts
    }

    pub fn pending_reconnect(&self) -> Option<PendingReconnect> {
        self.pending
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Starts connecting. Does nothing while connecting or connected.
    ///
    /// A pending reconnect is superseded by this attempt.
    ///
    /// # Errors
    ///
    /// Returns the transport's error when it cannot even begin opening. The
    /// failure is handled like a dropped connection, so a reconnect may
    /// already be scheduled when this returns.
    pub fn connect(&mut self) -> Result<(), ChannelError> {
        if self.state != ConnectionState::Disconnected {
            debug!("connect() ignored, channel is {:?}", self.state);
            return Ok(());
        }

        self.pending = None;
        self.state = ConnectionState::Connecting;
        info!("Channel connecting");

        if let Err(e) = self.transport.open() {
            error!("Failed to initialize channel: {}", e);
            self.connection_lost();
            return Err(e);
        }
        Ok(())
    }

    /// The transport finished opening.
    pub fn handle_open(&mut self) {
        info!("Channel connected");
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        self.pending = None;
    }

    /// The transport closed.
    pub fn handle_close(&mut self) {
        info!("Channel disconnected");
        self.connection_lost();
    }

    /// The transport reported an error.
    ///
    /// An error followed by a close for the same connection schedules a
    /// single reconnect.
    pub fn handle_error(&mut self, err: &ChannelError) {
        error!("Channel error: {}", err);
        self.connection_lost();
    }

    fn connection_lost(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.state = ConnectionState::Disconnected;

        if self.attempts >= self.config.max_attempts {
            warn!(
                "Giving up after {} reconnect attempts; call connect() to retry",
                self.attempts
            );
            return;
        }

        self.attempts += 1;
        let delay = self.config.base_delay * self.attempts;
        info!(
            "Attempting to reconnect ({}/{}) in {:?}",
            self.attempts, self.config.max_attempts, delay
        );
        self.pending = Some(PendingReconnect {
            attempt: self.attempts,
            delay,
            due: Instant::now() + delay,
        });
    }

    /// Fires the pending reconnect if it is due at `now`.
    ///
    /// Returns true when a reconnect was started.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(pending) if pending.due <= now => {
                self.pending = None;
                debug!("Reconnect attempt {} firing", pending.attempt);
                // connect() already rescheduled on failure
                if let Err(e) = self.connect() {
                    debug!("Reconnect attempt {} failed: {}", pending.attempt, e);
                }
                true
            }
            _ => false,
        }
    }

    /// Cancels any pending reconnect and closes the transport.
    pub fn disconnect(&mut self) {
        self.pending = None;
        if self.state != ConnectionState::Disconnected {
            self.transport.close();
        }
        self.state = ConnectionState::Disconnected;
        info!("Channel closed by caller");
    }

    /// Sends `{type, data, timestamp}` if connected.
    ///
    /// Returns false when the message was dropped: not connected, or the
    /// transport rejected it. Messages are never queued.
    pub fn send(&mut self, kind: &str, data: Value) -> bool {
        if self.state != ConnectionState::Connected {
            warn!("Dropping '{}' message, channel is {:?}", kind, self.state);
            return false;
        }

        let result = ChannelMessage::new(kind, data)
            .encode()
            .and_then(|text| self.transport.send(&text));
        match result {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send '{}' message: {}", kind, e);
                false
            }
        }
    }

    /// Registers the handler for `kind`, replacing any previous one.
    pub fn on_message<F>(&mut self, kind: impl Into<String>, handler: F)
    where
        F: FnMut(&Value) + Send + 'static,
    {
        self.handlers.insert(kind.into(), Box::new(handler));
    }

    /// Removes the handler for `kind`. Returns true if one was registered.
    pub fn off_message(&mut self, kind: &str) -> bool {
        self.handlers.remove(kind).is_some()
    }

    /// Parses and routes one incoming message.
    pub fn handle_message(&mut self, text: &str) -> Delivery {
        match ChannelMessage::decode(text) {
            Ok(message) => self.deliver(&message),
            Err(e) => {
                error!("Error parsing channel message: {}", e);
                Delivery::Malformed
            }
        }
    }

    /// Routes a decoded message to its handler, else the built-in one.
    pub fn deliver(&mut self, message: &ChannelMessage) -> Delivery {
        if let Some(handler) = self.handlers.get_mut(&message.kind) {
            handler(&message.data);
            return Delivery::Handler;
        }

        match builtin_label(&message.kind) {
            Some(label) => {
                info!("{}: {}", label, message.data);
                Delivery::BuiltIn
            }
            None => {
                info!("Received message: {:?}", message);
                Delivery::Unhandled
            }
        }
    }
}

fn builtin_label(kind: &str) -> Option<&'static str> {
    let label = match kind {
        "welcome" => "Received welcome message",
        "metrics" => "Received metrics",
        "search_broadcast" | "search_share" => "Collaborative search",
        "user_join" => "User joined",
        "user_leave" => "User left",
        "user_update" => "User updated",
        "template_share" => "Template shared",
        "realtime_results" => "Real-time results",
        _ => return None,
    };
    Some(label)
}
