//! Integration test common infrastructure.
//!
//! Provides a scriptable mock transport, a recording hub, and a harness that
//! wires a connector instance together the way a host framework would.
#![allow(dead_code)]

pub mod hub;
pub mod transport;

pub use hub::RecordingHub;
pub use transport::{MockFactory, MockTransport};

use irc_bridge::{ConnectionManager, ConnectorConfig, EventRouter, Outbound};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A minimal valid configuration for `nick` on a test network.
pub fn base_config(nick: &str) -> ConnectorConfig {
    ConnectorConfig {
        server: "irc.example.net".to_string(),
        nick: nick.to_string(),
        ..ConnectorConfig::default()
    }
}

/// One connector instance wired to a mock transport and recording hub.
pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub hub: Arc<RecordingHub>,
    pub outbound: mpsc::Sender<Outbound>,
    pub router: JoinHandle<ConnectionManager>,
}

impl Harness {
    /// Load, connect, and spawn the router for `config`.
    pub async fn start(config: ConnectorConfig) -> Self {
        let transport = MockTransport::new(&config.nick);
        let factory = MockFactory::new(Arc::clone(&transport));
        let hub = Arc::new(RecordingHub::default());

        let mut manager = ConnectionManager::load("irc-0", config, &factory, None);
        manager.connect(hub.as_ref()).await;

        let (outbound, outbound_rx) = mpsc::channel(16);
        let hub_dyn: Arc<dyn irc_bridge::Hub> = Arc::clone(&hub) as Arc<dyn irc_bridge::Hub>;
        let router = tokio::spawn(EventRouter::new(manager, hub_dyn, outbound_rx).run());

        Self {
            transport,
            hub,
            outbound,
            router,
        }
    }

    /// Stop the router via an explicit disconnect and return its manager.
    pub async fn shutdown(self) -> ConnectionManager {
        self.outbound
            .send(Outbound::Disconnect { message: None })
            .await
            .expect("router gone before shutdown");
        self.router.await.expect("router panicked")
    }
}

/// Poll until `cond` holds, panicking after two seconds.
pub async fn wait_until(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
