//! Connector configuration.
//!
//! Configuration is modelled as an immutable snapshot: the router never
//! mutates a snapshot in place. Updates (channel joined on invite, channel
//! removed on kick) go through `with_*` operations that produce a new
//! snapshot, which the caller then hands to the host's persistence path.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Reserved `chan_config` key holding network-wide grants and overrides.
pub const GLOBAL_SCOPE: &str = "global";

/// Command prefixes recognized when no override is configured.
pub const DEFAULT_COMMAND_DELIMITERS: [&str; 2] = ["!", "."];

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("required option `{0}` missing or empty")]
    MissingOption(&'static str),
}

/// Per-channel configuration overrides.
///
/// Also used for the reserved [`GLOBAL_SCOPE`] entry, where `users` holds
/// network-wide grants and `alert`/`command_delimiters` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChannelOverrides {
    /// Command prefixes overriding the instance-level setting.
    #[serde(default)]
    pub command_delimiters: Vec<String>,
    /// Identity key (`user@host`) to ordered permission grants.
    #[serde(default)]
    pub users: BTreeMap<String, Vec<String>>,
    /// Whether broadcast alerts are delivered to this channel.
    #[serde(default)]
    pub alert: bool,
}

/// One connector instance's configuration snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectorConfig {
    /// Server address to connect to. Required.
    #[serde(default)]
    pub server: String,
    /// Desired nick on the network. Required.
    #[serde(default)]
    pub nick: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Username presented at registration.
    #[serde(default = "default_ident")]
    pub user_name: String,
    /// Real name presented at registration.
    #[serde(default = "default_ident")]
    pub real_name: String,
    /// Channels to join after registration. May accumulate duplicates from
    /// external edits; removal operations clear every occurrence.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Instance-level command prefix override.
    #[serde(default)]
    pub command_delimiters: Vec<String>,
    /// Per-channel overrides, keyed by channel name plus [`GLOBAL_SCOPE`].
    #[serde(default)]
    pub chan_config: BTreeMap<String, ChannelOverrides>,
    /// Greeting said after joining a channel on invite.
    #[serde(default)]
    pub join_msg: Option<String>,
    /// Suppress the invite greeting entirely.
    #[serde(default)]
    pub silent_join: bool,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            nick: String::new(),
            port: default_port(),
            user_name: default_ident(),
            real_name: default_ident(),
            channels: Vec::new(),
            command_delimiters: Vec::new(),
            chan_config: BTreeMap::new(),
            join_msg: None,
            silent_join: false,
        }
    }
}

impl ConnectorConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: ConnectorConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Check that the options a connection cannot be built without are set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.trim().is_empty() {
            return Err(ConfigError::MissingOption("server"));
        }
        if self.nick.trim().is_empty() {
            return Err(ConfigError::MissingOption("nick"));
        }
        Ok(())
    }

    /// Overrides for `channel`, if any are configured.
    pub fn channel_overrides(&self, channel: &str) -> Option<&ChannelOverrides> {
        self.chan_config.get(channel)
    }

    /// Command delimiters effective in `channel`.
    ///
    /// Precedence: per-channel override, then instance-level override, then
    /// [`DEFAULT_COMMAND_DELIMITERS`]. First non-empty list wins; levels are
    /// never merged.
    pub fn delimiters_for(&self, channel: &str) -> Vec<String> {
        if let Some(overrides) = self.channel_overrides(channel) {
            if !overrides.command_delimiters.is_empty() {
                return overrides.command_delimiters.clone();
            }
        }
        if !self.command_delimiters.is_empty() {
            return self.command_delimiters.clone();
        }
        DEFAULT_COMMAND_DELIMITERS
            .iter()
            .map(|d| (*d).to_string())
            .collect()
    }

    /// New snapshot with `channel` appended to the join list.
    ///
    /// Refuses to introduce a duplicate entry; returns a plain clone if the
    /// channel is already listed.
    pub fn with_channel_added(&self, channel: &str) -> Self {
        let mut next = self.clone();
        if !next.channels.iter().any(|c| c == channel) {
            next.channels.push(channel.to_string());
        }
        next
    }

    /// New snapshot with every occurrence of `channel` removed from the join
    /// list and its per-channel overrides dropped.
    pub fn with_channel_removed(&self, channel: &str) -> Self {
        let mut next = self.clone();
        next.channels.retain(|c| c != channel);
        next.chan_config.remove(channel);
        next
    }
}

fn default_port() -> u16 {
    6667
}

fn default_ident() -> String {
    "irc-bridge".to_string()
}
