//! Scriptable mock transport.

use async_trait::async_trait;
use irc_bridge::{
    EventCategory, RoleMarker, Transport, TransportError, TransportEvent, TransportFactory,
    TransportSettings,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Mutable mock state, scripted by tests and inspected in assertions.
#[derive(Default)]
pub struct MockState {
    pub connected: bool,
    pub nick: String,
    /// `(target, text)` pairs delivered via `say`.
    pub said: Vec<(String, String)>,
    /// `(target, text)` pairs delivered via `act`.
    pub acted: Vec<(String, String)>,
    /// `(command, args)` pairs delivered via `send_raw`.
    pub raw: Vec<(String, Vec<String>)>,
    pub joined: Vec<String>,
    pub farewells: Vec<String>,
    /// channel -> nick -> role, keys lowercased like a real snapshot.
    pub membership: HashMap<String, HashMap<String, RoleMarker>>,
    /// `say` to these targets fails.
    pub fail_say: HashSet<String>,
    /// `join_channel` fails.
    pub fail_join: bool,
}

pub struct MockTransport {
    pub state: Mutex<MockState>,
    pub connect_calls: AtomicUsize,
    pub disconnect_calls: AtomicUsize,
    pub attach_calls: AtomicUsize,
    pub detach_calls: AtomicUsize,
    attached: Mutex<HashSet<EventCategory>>,
    events: Mutex<Option<mpsc::Sender<TransportEvent>>>,
}

impl MockTransport {
    pub fn new(nick: &str) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(MockState {
                nick: nick.to_string(),
                ..MockState::default()
            }),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
            attach_calls: AtomicUsize::new(0),
            detach_calls: AtomicUsize::new(0),
            attached: Mutex::new(HashSet::new()),
            events: Mutex::new(None),
        })
    }

    pub fn set_nick(&self, nick: &str) {
        self.state.lock().nick = nick.to_string();
    }

    pub fn set_role(&self, channel: &str, nick: &str, role: RoleMarker) {
        self.state
            .lock()
            .membership
            .entry(channel.to_lowercase())
            .or_default()
            .insert(nick.to_string(), role);
    }

    /// Deliver an event to the attached subscriber, if its category is
    /// subscribed.
    pub async fn push(&self, event: TransportEvent) {
        if !self.attached.lock().contains(&event.category()) {
            return;
        }
        let sender = self.events.lock().clone();
        if let Some(sender) = sender {
            sender.send(event).await.expect("subscriber dropped");
        }
    }

    pub fn raw_count(&self) -> usize {
        self.state.lock().raw.len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        self.state.lock().connected = true;
        Ok(())
    }

    async fn disconnect(&self, message: &str) -> Result<(), TransportError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.connected = false;
        state.farewells.push(message.to_string());
        Ok(())
    }

    async fn say(&self, target: &str, text: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_say.contains(target) {
            return Err(TransportError::Delivery {
                target: target.to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        state.said.push((target.to_string(), text.to_string()));
        Ok(())
    }

    async fn act(&self, target: &str, text: &str) -> Result<(), TransportError> {
        self.state
            .lock()
            .acted
            .push((target.to_string(), text.to_string()));
        Ok(())
    }

    async fn join_channel(&self, channel: &str) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_join {
            return Err(TransportError::Join {
                channel: channel.to_string(),
                detail: "scripted failure".to_string(),
            });
        }
        state.joined.push(channel.to_string());
        Ok(())
    }

    async fn send_raw(&self, command: &str, args: &[&str]) -> Result<(), TransportError> {
        self.state.lock().raw.push((
            command.to_string(),
            args.iter().map(|a| (*a).to_string()).collect(),
        ));
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.lock().connected
    }

    fn current_nick(&self) -> String {
        self.state.lock().nick.clone()
    }

    fn channel_role(&self, channel: &str, nick: &str) -> Option<RoleMarker> {
        self.state
            .lock()
            .membership
            .get(channel)
            .and_then(|users| users.get(nick))
            .copied()
    }

    fn attach(&self, categories: &[EventCategory]) -> mpsc::Receiver<TransportEvent> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(64);
        *self.events.lock() = Some(tx);
        self.attached.lock().extend(categories.iter().copied());
        rx
    }

    fn detach(&self, categories: &[EventCategory]) {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        let mut attached = self.attached.lock();
        for category in categories {
            attached.remove(category);
        }
        if attached.is_empty() {
            *self.events.lock() = None;
        }
    }
}

/// Factory handing out one prepared mock transport, recording the settings
/// it was asked to build with.
pub struct MockFactory {
    transport: Arc<MockTransport>,
    pub settings: Mutex<Option<TransportSettings>>,
}

impl MockFactory {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            settings: Mutex::new(None),
        }
    }

    pub fn built_settings(&self) -> Option<TransportSettings> {
        self.settings.lock().clone()
    }
}

impl TransportFactory for MockFactory {
    fn build(&self, settings: &TransportSettings) -> Arc<dyn Transport> {
        *self.settings.lock() = Some(settings.clone());
        Arc::clone(&self.transport) as Arc<dyn Transport>
    }
}
