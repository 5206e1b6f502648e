//! irc-bridge - IRC connector for a message-bus bot framework.
//!
//! Bridges an IRC network to a host bot framework: inbound protocol events
//! become permission-annotated [`MessageContext`] values for the host's
//! command dispatcher, and host commands become wire sends. Per-user
//! authority merges live channel roles with per-channel and global persisted
//! grants under a fixed precedence. The live transport handle survives a hot
//! reload of the owning process via [`connection::PersistentObjects`],
//! without dropping the socket or re-authenticating.
//!
//! The wire protocol itself lives behind the [`transport::Transport`] trait;
//! the host framework behind [`hub::Hub`]. Each connector instance is a
//! single logical actor: the [`router::EventRouter`] task owns all mutable
//! instance state.

pub mod config;
pub mod connection;
pub mod context;
pub mod hub;
pub mod permissions;
pub mod router;
pub mod style;
pub mod transport;

pub use config::{ChannelOverrides, ConfigError, ConnectorConfig};
pub use connection::{ConnectionManager, LinkState, PersistentObjects};
pub use context::MessageContext;
pub use hub::{BusEvent, Hub, Outbound, OutboundRegistry};
pub use permissions::RoleMarker;
pub use router::EventRouter;
pub use style::{IrcStyler, TextDecorator};
pub use transport::{
    EventCategory, RawMessage, Transport, TransportError, TransportEvent, TransportFactory,
    TransportSettings,
};
