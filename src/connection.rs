//! Connection lifecycle management.
//!
//! The [`ConnectionManager`] is the only component holding transport state.
//! On load it either builds a fresh handle from configuration or adopts one
//! handed down from the previous instance across a hot reload, rebinding the
//! event subscription either way. A config missing its server or nick puts
//! the manager into a permanent failed state where connect and disconnect
//! are logged no-ops; the process stays alive and reports instead of
//! crashing.

use crate::config::ConnectorConfig;
use crate::hub::{BusEvent, Hub};
use crate::transport::{
    EventCategory, Transport, TransportEvent, TransportFactory, TransportSettings,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Farewell used when `disconnect` is called without a reason.
pub const DEFAULT_FAREWELL: &str = "Goodbye.";

/// Fixed retry interval of the nick-recovery watchdog.
pub const NICK_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Transport built (or adopted unopened), not yet connected.
    Configured,
    /// Socket open.
    Connected,
    /// Deliberately shut down; a later `connect` opens a new connection.
    Disconnected,
    /// Required configuration was missing at load time. Permanent.
    Failed,
}

/// Live resources exported to the next instance across a process reload.
///
/// In-memory handoff only; the handle is opaque to configuration and never
/// serialized.
pub struct PersistentObjects {
    /// The open (or openable) transport handle.
    pub client: Arc<dyn Transport>,
}

/// Owns the transport handle and its single event subscription.
pub struct ConnectionManager {
    instance_id: String,
    config: ConnectorConfig,
    client: Option<Arc<dyn Transport>>,
    state: LinkState,
    /// Adopted an already-open handle; the next `connect` resumes instead of
    /// dialing again.
    resumed: bool,
    events: Option<mpsc::Receiver<TransportEvent>>,
    watchdog: Option<JoinHandle<()>>,
}

impl ConnectionManager {
    /// Build a manager from configuration, optionally adopting a handle
    /// handed down by the previous instance.
    ///
    /// Adoption detaches the fixed set of event categories before attaching
    /// fresh ones, so buffered events can never double-fire into stale
    /// subscriptions.
    pub fn load(
        instance_id: &str,
        config: ConnectorConfig,
        factory: &dyn TransportFactory,
        handoff: Option<PersistentObjects>,
    ) -> Self {
        if let Err(e) = config.validate() {
            error!(instance = %instance_id, error = %e, "invalid connector config; instance disabled");
            return Self {
                instance_id: instance_id.to_string(),
                config,
                client: None,
                state: LinkState::Failed,
                resumed: false,
                events: None,
                watchdog: None,
            };
        }

        let (client, resumed) = match handoff {
            Some(persistent) => {
                let client = persistent.client;
                client.detach(&EventCategory::ALL);
                let open = client.is_connected();
                debug!(instance = %instance_id, open, "adopted transport handle from previous instance");
                (client, open)
            }
            None => {
                let settings = TransportSettings {
                    server: config.server.clone(),
                    port: config.port,
                    nick: config.nick.clone(),
                    user_name: config.user_name.clone(),
                    real_name: config.real_name.clone(),
                    channels: config.channels.clone(),
                };
                (factory.build(&settings), false)
            }
        };

        let events = client.attach(&EventCategory::ALL);
        Self {
            instance_id: instance_id.to_string(),
            config,
            client: Some(client),
            state: if resumed {
                LinkState::Connected
            } else {
                LinkState::Configured
            },
            resumed,
            events: Some(events),
            watchdog: None,
        }
    }

    /// Open the connection, or resume an adopted one without dialing.
    ///
    /// Emits [`BusEvent::ServerConnect`] on success. Refused in the failed
    /// state.
    pub async fn connect(&mut self, hub: &dyn Hub) {
        if self.state == LinkState::Failed {
            error!(instance = %self.instance_id, "cannot connect: instance disabled by config error");
            return;
        }
        if self.state == LinkState::Connected && !self.resumed {
            debug!(instance = %self.instance_id, "already connected");
            return;
        }
        let Some(client) = &self.client else {
            return;
        };

        if self.resumed {
            // Adopted handle is already open; dialing again would reconnect-storm.
            debug!(instance = %self.instance_id, "using previous connection");
            self.resumed = false;
        } else {
            if let Err(e) = client.connect().await {
                error!(instance = %self.instance_id, server = %self.config.server, error = %e, "connect failed");
                return;
            }
            info!(instance = %self.instance_id, server = %self.config.server, "connected");
        }
        self.state = LinkState::Connected;
        hub.emit(BusEvent::ServerConnect {
            instance_id: self.instance_id.clone(),
        })
        .await;
    }

    /// Close the connection. Cancels the nick watchdog; no automatic
    /// reconnection happens afterward. Refused in the failed state.
    pub async fn disconnect(&mut self, reason: Option<&str>) {
        if self.state == LinkState::Failed {
            error!(instance = %self.instance_id, "cannot disconnect: instance disabled by config error");
            return;
        }
        self.cancel_watchdog();
        if let Some(client) = &self.client {
            if let Err(e) = client.disconnect(reason.unwrap_or(DEFAULT_FAREWELL)).await {
                error!(instance = %self.instance_id, error = %e, "disconnect failed");
            }
        }
        self.state = LinkState::Disconnected;
    }

    /// Start the nick-recovery watchdog if the server gave us a different
    /// nick than configured.
    ///
    /// The watchdog re-issues `NICK` at a fixed interval until the desired
    /// nick is held, then stops on its own. It is cancelled by `disconnect`
    /// and on drop.
    pub fn ensure_nick(&mut self) {
        let Some(client) = self.client.clone() else {
            return;
        };
        let desired = self.config.nick.clone();
        if client.current_nick() == desired {
            return;
        }
        self.cancel_watchdog();

        let instance = self.instance_id.clone();
        warn!(instance = %instance, desired = %desired, actual = %client.current_nick(), "configured nick not held; starting recovery");
        self.watchdog = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval(NICK_RETRY_INTERVAL);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if client.current_nick() == desired {
                    break;
                }
                if let Err(e) = client.send_raw("NICK", &[&desired]).await {
                    warn!(instance = %instance, error = %e, "nick recovery attempt failed");
                }
            }
            debug!(instance = %instance, nick = %desired, "nick recovered");
        }));
    }

    /// Whether a nick-recovery task is still running.
    pub fn watchdog_running(&self) -> bool {
        self.watchdog.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel_watchdog(&mut self) {
        if let Some(handle) = self.watchdog.take() {
            handle.abort();
        }
    }

    /// Export the transport handle for the next instance across a reload.
    /// The subscription and any running watchdog stay behind and are torn
    /// down here.
    pub fn take_persistent_objects(&mut self) -> Option<PersistentObjects> {
        self.cancel_watchdog();
        self.events = None;
        self.client.take().map(|client| PersistentObjects { client })
    }

    /// Take the transport event stream. The router calls this exactly once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<TransportEvent>> {
        self.events.take()
    }

    pub fn client(&self) -> Option<&Arc<dyn Transport>> {
        self.client.as_ref()
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Install a new configuration snapshot (after a persisted update).
    pub fn apply_config(&mut self, config: ConnectorConfig) {
        self.config = config;
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel_watchdog();
    }
}
