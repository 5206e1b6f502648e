//! Permission resolution.
//!
//! Merges three independent sources of authority into one ordered permission
//! list: the live channel role reported by the transport, per-channel grants
//! from persisted configuration, and global grants from persisted
//! configuration. Pure functions only; membership data is supplied by the
//! caller as a fallible lookup.

use crate::config::{ConnectorConfig, GLOBAL_SCOPE};

/// Channel role marker as tracked by the transport's membership snapshot.
///
/// Corresponds to the IRC prefix sigils `~ & @ % +`. Anything else the
/// network might report maps to no role at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleMarker {
    Owner,
    Protected,
    Op,
    HalfOp,
    Voice,
}

impl RoleMarker {
    /// Parse a membership sigil. Unrecognized sigils yield `None`.
    pub fn from_sigil(sigil: char) -> Option<Self> {
        match sigil {
            '~' => Some(Self::Owner),
            '&' => Some(Self::Protected),
            '@' => Some(Self::Op),
            '%' => Some(Self::HalfOp),
            '+' => Some(Self::Voice),
            _ => None,
        }
    }

    /// The single coarse permission string derived from this role.
    pub fn permission(self) -> &'static str {
        match self {
            Self::Owner => "irc.channel.owner",
            Self::Protected => "irc.channel.protected",
            Self::Op => "irc.channel.op",
            Self::HalfOp => "irc.channel.halfop",
            Self::Voice => "irc.channel.voice",
        }
    }
}

/// Resolve the permissions held by `identity` speaking as `nick` in `channel`.
///
/// `lookup_role` queries the transport's live membership snapshot; a miss
/// (untracked channel or user) is `None` and is never an error. For a private
/// message the counterparty nick stands in for the channel, so `nick ==
/// channel` skips the membership lookup entirely and only global grants
/// apply.
///
/// The role-derived permission, if any, is always first. Grants are appended
/// in stored order, channel scope before global scope, without deduplication;
/// consumers treat the list as a set.
pub fn resolve<F>(
    config: &ConnectorConfig,
    lookup_role: F,
    identity: &str,
    nick: &str,
    channel: &str,
) -> Vec<String>
where
    F: FnOnce(&str, &str) -> Option<RoleMarker>,
{
    let mut perms = Vec::new();

    if nick == channel {
        // Private message: live membership and channel grants do not apply.
        append_grants(&mut perms, config, GLOBAL_SCOPE, identity);
        return perms;
    }

    // Membership snapshots are keyed by lowercased channel name.
    if let Some(role) = lookup_role(&channel.to_lowercase(), nick) {
        perms.push(role.permission().to_string());
    }

    append_grants(&mut perms, config, channel, identity);
    append_grants(&mut perms, config, GLOBAL_SCOPE, identity);
    perms
}

fn append_grants(out: &mut Vec<String>, config: &ConnectorConfig, scope: &str, identity: &str) {
    if let Some(grants) = config
        .channel_overrides(scope)
        .and_then(|o| o.users.get(identity))
    {
        out.extend(grants.iter().cloned());
    }
}
