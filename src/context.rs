//! Message contexts.
//!
//! A [`MessageContext`] is the immutable snapshot of one inbound event plus
//! resolved routing and permission metadata, handed to the host framework's
//! dispatcher. Contexts are never mutated after construction; the
//! `with_*` operations produce new values sharing the unchanged fields,
//! which is how one alert gets rebroadcast to many channels.

use crate::config::ConnectorConfig;
use crate::permissions;
use crate::transport::{RawMessage, Transport};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Protocol-type tag carried by every context this connector produces.
pub const NETWORK_TAG: &str = "irc";

/// Well-known custom-data keys.
pub mod custom_keys {
    /// Set when the inbound event was an action (emote), and on outbound
    /// contexts that should be delivered as one.
    pub const IRC_ACTION: &str = "ircAction";
    /// Set when the reply must not be prefixed with the addressee's nick.
    pub const NO_PREFIX: &str = "noPrefix";
}

/// Immutable per-event context passed through the dispatch pipeline.
#[derive(Debug, Clone)]
pub struct MessageContext {
    instance_id: String,
    nick: String,
    text: String,
    to: String,
    identity: String,
    command_delimiters: Vec<String>,
    my_nick: String,
    permissions: Vec<String>,
    raw: Option<Arc<RawMessage>>,
    custom: BTreeMap<String, Value>,
}

impl MessageContext {
    /// Build a context from an inbound event.
    ///
    /// Infallible: identity comes from the raw event's origin fields,
    /// delimiters from configured precedence, permissions from the resolver
    /// with the transport's live membership snapshot. Malformed events are
    /// the transport's concern, not handled here.
    pub fn from_event(
        instance_id: &str,
        config: &ConnectorConfig,
        transport: &dyn Transport,
        raw: Arc<RawMessage>,
        to: &str,
        text: &str,
    ) -> Self {
        let identity = raw.identity_key();
        let permissions = permissions::resolve(
            config,
            |channel, nick| transport.channel_role(channel, nick),
            &identity,
            &raw.nick,
            to,
        );
        Self {
            instance_id: instance_id.to_string(),
            nick: raw.nick.clone(),
            text: text.to_string(),
            to: to.to_string(),
            identity,
            command_delimiters: config.delimiters_for(to),
            my_nick: transport.current_nick(),
            permissions,
            raw: Some(raw),
            custom: BTreeMap::new(),
        }
    }

    /// Minimal context for connector-originated sends (greetings, alerts),
    /// where there is no inbound event to derive fields from.
    pub fn outbound(instance_id: &str, my_nick: &str) -> Self {
        Self {
            instance_id: instance_id.to_string(),
            nick: String::new(),
            text: String::new(),
            to: String::new(),
            identity: String::new(),
            command_delimiters: Vec::new(),
            my_nick: my_nick.to_string(),
            permissions: Vec::new(),
            raw: None,
            custom: BTreeMap::new(),
        }
    }

    /// New context with the destination overridden.
    pub fn with_destination(&self, to: &str) -> Self {
        let mut next = self.clone();
        next.to = to.to_string();
        next
    }

    /// New context with one custom-data entry added.
    pub fn with_custom(&self, key: &str, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.custom.insert(key.to_string(), value.into());
        next
    }

    /// Protocol tag, always [`NETWORK_TAG`] for this connector.
    pub fn network(&self) -> &'static str {
        NETWORK_TAG
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Speaker's display nick.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Destination channel, or counterparty nick for a private message.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// Stable `user@host` identity key of the speaker.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn command_delimiters(&self) -> &[String] {
        &self.command_delimiters
    }

    /// Our own nick at the time the event arrived.
    pub fn my_nick(&self) -> &str {
        &self.my_nick
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }

    /// The underlying protocol frame, when this context came off the wire.
    pub fn raw(&self) -> Option<&Arc<RawMessage>> {
        self.raw.as_ref()
    }

    pub fn custom(&self, key: &str) -> Option<&Value> {
        self.custom.get(key)
    }

    fn custom_flag(&self, key: &str) -> bool {
        self.custom(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// Whether this context represents (or requests) an action/emote.
    pub fn is_action(&self) -> bool {
        self.custom_flag(custom_keys::IRC_ACTION)
    }

    /// Whether the reply should skip the `nick: ` prefix.
    pub fn no_prefix(&self) -> bool {
        self.custom_flag(custom_keys::NO_PREFIX)
    }
}
