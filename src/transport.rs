//! Transport collaborator interface.
//!
//! The wire protocol itself (framing, numeric replies, reconnect plumbing)
//! lives behind the [`Transport`] trait. The connector only sees parsed
//! events on an mpsc stream and a handful of outbound send primitives, plus
//! a queryable live membership snapshot.

use crate::permissions::RoleMarker;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Transport-level failures.
///
/// These are always absorbed at the call site: logged with their target and
/// detail, never allowed to take the process down.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("not connected to {server}")]
    NotConnected { server: String },
    #[error("delivery to {target} failed: {detail}")]
    Delivery { target: String, detail: String },
    #[error("join of {channel} failed: {detail}")]
    Join { channel: String, detail: String },
}

/// Parsed protocol frame as delivered by the transport.
///
/// Carried inside [`TransportEvent`] and kept on the message context for
/// collaborators that need protocol-specific fields.
#[derive(Debug, Clone, Default)]
pub struct RawMessage {
    /// Origin nick.
    pub nick: String,
    /// Origin username.
    pub user: String,
    /// Origin host.
    pub host: String,
    /// Protocol command (PRIVMSG, NOTICE, numeric, ...).
    pub command: String,
    /// Command arguments; for PRIVMSG, `args[1]` is the text.
    pub args: Vec<String>,
}

impl RawMessage {
    /// Stable `user@host` identity key used for permission lookups.
    ///
    /// Distinct from the display nick, which can change at any time.
    pub fn identity_key(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

/// The fixed, finite set of event categories the connector subscribes to.
///
/// Handle adoption across a reload detaches exactly these categories before
/// attaching fresh ones, so listeners owned by other collaborators sharing
/// the handle are never stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Message,
    Action,
    Join,
    Part,
    Kick,
    Invite,
    Nick,
    Registered,
    Error,
}

impl EventCategory {
    /// Every category the connector ever subscribes to.
    pub const ALL: [EventCategory; 9] = [
        Self::Message,
        Self::Action,
        Self::Join,
        Self::Part,
        Self::Kick,
        Self::Invite,
        Self::Nick,
        Self::Registered,
        Self::Error,
    ];
}

/// A parsed event delivered by the transport.
///
/// FIFO ordering holds within one category as delivered by the transport;
/// nothing is guaranteed between categories.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    Message {
        nick: String,
        to: String,
        text: String,
        raw: Arc<RawMessage>,
    },
    Action {
        nick: String,
        to: String,
        text: String,
        raw: Arc<RawMessage>,
    },
    Join {
        channel: String,
        nick: String,
    },
    Part {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
    Kick {
        channel: String,
        nick: String,
        by: String,
        reason: Option<String>,
    },
    Invite {
        channel: String,
        from: String,
    },
    Nick {
        old: String,
        new: String,
    },
    Registered,
    Error {
        raw: Arc<RawMessage>,
    },
}

impl TransportEvent {
    /// The category this event belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            Self::Message { .. } => EventCategory::Message,
            Self::Action { .. } => EventCategory::Action,
            Self::Join { .. } => EventCategory::Join,
            Self::Part { .. } => EventCategory::Part,
            Self::Kick { .. } => EventCategory::Kick,
            Self::Invite { .. } => EventCategory::Invite,
            Self::Nick { .. } => EventCategory::Nick,
            Self::Registered => EventCategory::Registered,
            Self::Error { .. } => EventCategory::Error,
        }
    }
}

/// Settings a fresh transport handle is built from.
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub server: String,
    pub port: u16,
    pub nick: String,
    pub user_name: String,
    pub real_name: String,
    pub channels: Vec<String>,
}

/// The live connection handle to the chat network.
///
/// Implementations deliver parsed events over the receiver returned by
/// [`Transport::attach`] and accept outbound sends. A handle may outlive one
/// connector instance: across a hot reload it is handed to the successor
/// without closing the socket.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the network connection and register.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Close the connection with a farewell message.
    async fn disconnect(&self, message: &str) -> Result<(), TransportError>;

    /// Send a normal message to a channel or nick.
    async fn say(&self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Send an action (emote) to a channel or nick.
    async fn act(&self, target: &str, text: &str) -> Result<(), TransportError>;

    /// Join a channel; resolves once the server confirms the join.
    async fn join_channel(&self, channel: &str) -> Result<(), TransportError>;

    /// Send a raw protocol command.
    async fn send_raw(&self, command: &str, args: &[&str]) -> Result<(), TransportError>;

    /// Whether the socket is currently open.
    fn is_connected(&self) -> bool;

    /// The nick the server currently knows this connection by. May differ
    /// from the configured nick when it was claimed by someone else.
    fn current_nick(&self) -> String;

    /// Live membership lookup: the role of `nick` in `channel` (lowercased).
    /// A miss is `None`, never an error.
    fn channel_role(&self, channel: &str, nick: &str) -> Option<RoleMarker>;

    /// Attach a fresh event subscription for the given categories and return
    /// its delivery stream. At most one live subscription set may exist per
    /// handle; callers detach before re-attaching.
    fn attach(&self, categories: &[EventCategory]) -> mpsc::Receiver<TransportEvent>;

    /// Detach every listener previously attached for the given categories.
    fn detach(&self, categories: &[EventCategory]);
}

/// Builds fresh transport handles from configuration.
pub trait TransportFactory: Send + Sync {
    fn build(&self, settings: &TransportSettings) -> Arc<dyn Transport>;
}
