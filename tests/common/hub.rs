//! Recording host framework stub.

use async_trait::async_trait;
use irc_bridge::{BusEvent, ConnectorConfig, Hub, MessageContext};
use parking_lot::Mutex;

/// Records everything the connector hands to the host.
#[derive(Default)]
pub struct RecordingHub {
    pub dispatched: Mutex<Vec<MessageContext>>,
    pub events: Mutex<Vec<BusEvent>>,
    /// `(to, text)` pairs reported through `sent_message`.
    pub sent: Mutex<Vec<(String, String)>>,
    pub saves: Mutex<Vec<ConnectorConfig>>,
}

impl RecordingHub {
    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().len()
    }

    pub fn save_count(&self) -> usize {
        self.saves.lock().len()
    }

    pub fn server_connects(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, BusEvent::ServerConnect { .. }))
            .count()
    }
}

#[async_trait]
impl Hub for RecordingHub {
    async fn dispatch(&self, ctx: MessageContext) {
        self.dispatched.lock().push(ctx);
    }

    async fn emit(&self, event: BusEvent) {
        self.events.lock().push(event);
    }

    async fn sent_message(&self, to: &str, text: &str, _ctx: &MessageContext) {
        self.sent.lock().push((to.to_string(), text.to_string()));
    }

    async fn save_config(&self, config: &ConnectorConfig, _instance_id: &str, _update: bool) {
        self.saves.lock().push(config.clone());
    }
}
