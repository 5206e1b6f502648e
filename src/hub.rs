//! Host framework collaborator interface.
//!
//! The connector talks to its host through two seams: the [`Hub`] trait for
//! everything flowing toward the host (dispatch, bus events, audit logging,
//! config persistence), and a per-instance [`Outbound`] channel for commands
//! flowing back. The channel replaces string-built event names keyed by
//! instance id with a typed registry: each instance owns exactly one
//! receiver, and the host addresses it through [`OutboundRegistry`].

use crate::config::ConnectorConfig;
use crate::context::MessageContext;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Events the connector raises on the host's message bus.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// The instance has an open server connection.
    ServerConnect { instance_id: String },
    /// Registration with the server completed.
    Registered { instance_id: String },
    /// Someone changed nick.
    NickChange { old: String, new: String },
    /// Someone else joined a channel we are in.
    ChannelJoin { channel: String, nick: String },
    /// Someone else left a channel we are in.
    ChannelPart {
        channel: String,
        nick: String,
        reason: Option<String>,
    },
}

/// Host framework capabilities consumed by the connector.
#[async_trait]
pub trait Hub: Send + Sync {
    /// Hand an inbound message context to the host's command dispatcher.
    async fn dispatch(&self, ctx: MessageContext);

    /// Raise a named event on the host bus.
    async fn emit(&self, event: BusEvent);

    /// Record a message the connector delivered to the wire.
    async fn sent_message(&self, to: &str, text: &str, ctx: &MessageContext);

    /// Persist a configuration snapshot for this instance.
    async fn save_config(&self, config: &ConnectorConfig, instance_id: &str, update: bool);
}

/// Commands the host sends to one connector instance.
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Deliver a message; prefixed with the addressee's nick unless the
    /// context opts out, and sent as an action when the context asks for it.
    Say {
        to: String,
        text: String,
        ctx: MessageContext,
    },
    /// Deliver an action (emote), never prefixed.
    Emote {
        to: String,
        text: String,
        ctx: MessageContext,
    },
    /// Broadcast to every alert-subscribed channel.
    Alert { text: String },
    /// Close the connection and stop the router.
    Disconnect { message: Option<String> },
}

/// Typed table mapping instance identity to its outbound command sender.
#[derive(Debug, Default)]
pub struct OutboundRegistry {
    senders: HashMap<String, mpsc::Sender<Outbound>>,
}

impl OutboundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instance and hand back the receiver its router drains.
    /// Re-registering an id replaces the previous sender.
    pub fn register(&mut self, instance_id: &str, capacity: usize) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(capacity);
        self.senders.insert(instance_id.to_string(), tx);
        rx
    }

    /// The sender bound to `instance_id`, if registered.
    pub fn sender(&self, instance_id: &str) -> Option<mpsc::Sender<Outbound>> {
        self.senders.get(instance_id).cloned()
    }

    /// Drop an instance's binding. Its router sees a closed channel and
    /// winds down.
    pub fn deregister(&mut self, instance_id: &str) {
        self.senders.remove(instance_id);
    }
}
