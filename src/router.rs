//! Event routing between the transport and the host bus.
//!
//! One router task per connector instance drives both directions: transport
//! events become message contexts or bus events for the host, and host
//! commands become wire sends. Everything runs on one cooperative loop, so
//! instance state needs no locking. Failures are absorbed where they occur;
//! nothing here can take the process down.

use crate::connection::ConnectionManager;
use crate::context::{custom_keys, MessageContext};
use crate::hub::{BusEvent, Hub, Outbound};
use crate::transport::{Transport, TransportEvent};
use std::sync::Arc;
use tracing::{debug, error, info, trace};

fn default_join_msg(nick: &str) -> String {
    format!(
        "Hello, everyone! I'm {nick}! I respond to commands and generally try to be helpful. \
         For more information, say \".help\"!"
    )
}

/// Routes one instance's events until disconnected or deregistered.
pub struct EventRouter {
    manager: ConnectionManager,
    hub: Arc<dyn Hub>,
    outbound: tokio::sync::mpsc::Receiver<Outbound>,
}

impl EventRouter {
    pub fn new(
        manager: ConnectionManager,
        hub: Arc<dyn Hub>,
        outbound: tokio::sync::mpsc::Receiver<Outbound>,
    ) -> Self {
        Self {
            manager,
            hub,
            outbound,
        }
    }

    /// Drive the instance until the transport stream ends, the host drops
    /// the outbound channel, or an explicit disconnect arrives.
    ///
    /// Returns the manager so the host can export the transport handle for
    /// a reload handoff.
    pub async fn run(mut self) -> ConnectionManager {
        let Some(mut events) = self.manager.take_events() else {
            error!(instance = %self.manager.instance_id(), "router not started: no event stream");
            return self.manager;
        };

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event).await,
                    None => break,
                },
                command = self.outbound.recv() => match command {
                    Some(command) => {
                        if !self.handle_outbound(command).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        self.manager
    }

    async fn handle_event(&mut self, event: TransportEvent) {
        let Some(client) = self.manager.client().map(Arc::clone) else {
            return;
        };
        let instance = self.manager.instance_id().to_string();
        let my_nick = client.current_nick();

        match event {
            TransportEvent::Message { nick, to, text, raw } => {
                // A private message addressed to us is rewritten so replies
                // go back to the sender.
                let to = if to == my_nick { nick } else { to };
                let ctx = MessageContext::from_event(
                    &instance,
                    self.manager.config(),
                    client.as_ref(),
                    raw,
                    &to,
                    &text,
                );
                self.hub.dispatch(ctx).await;
            }
            TransportEvent::Action { nick, to, text, raw } => {
                let to = if to == my_nick { nick } else { to };
                let ctx = MessageContext::from_event(
                    &instance,
                    self.manager.config(),
                    client.as_ref(),
                    raw,
                    &to,
                    &text,
                )
                .with_custom(custom_keys::IRC_ACTION, true);
                self.hub.dispatch(ctx).await;
            }
            TransportEvent::Nick { old, new } => {
                trace!(instance = %instance, old = %old, new = %new, "nick change");
                self.hub.emit(BusEvent::NickChange { old, new }).await;
            }
            TransportEvent::Join { channel, nick } => {
                if nick == my_nick {
                    return;
                }
                trace!(instance = %instance, channel = %channel, nick = %nick, "join");
                self.hub.emit(BusEvent::ChannelJoin { channel, nick }).await;
            }
            TransportEvent::Part {
                channel,
                nick,
                reason,
            } => {
                if nick == my_nick {
                    return;
                }
                trace!(instance = %instance, channel = %channel, nick = %nick, "part");
                self.hub
                    .emit(BusEvent::ChannelPart {
                        channel,
                        nick,
                        reason,
                    })
                    .await;
            }
            TransportEvent::Invite { channel, from } => {
                debug!(instance = %instance, channel = %channel, from = %from, "invited; joining channel");
                self.handle_invite(&client, &instance, &channel).await;
            }
            TransportEvent::Kick {
                channel,
                nick,
                by,
                reason,
            } => {
                if nick != my_nick {
                    return;
                }
                debug!(
                    instance = %instance,
                    channel = %channel,
                    by = %by,
                    reason = reason.as_deref().unwrap_or(""),
                    "kicked; removing channel from config"
                );
                let next = self.manager.config().with_channel_removed(&channel);
                self.manager.apply_config(next);
                self.hub
                    .save_config(self.manager.config(), &instance, true)
                    .await;
            }
            TransportEvent::Registered => {
                info!(instance = %instance, server = %self.manager.config().server, "registered with server");
                self.hub
                    .emit(BusEvent::Registered {
                        instance_id: instance,
                    })
                    .await;
                self.manager.ensure_nick();
            }
            TransportEvent::Error { raw } => {
                error!(
                    instance = %instance,
                    command = %raw.command,
                    args = ?raw.args,
                    "error frame from server"
                );
            }
        }
    }

    async fn handle_invite(&mut self, client: &Arc<dyn Transport>, instance: &str, channel: &str) {
        if let Err(e) = client.join_channel(channel).await {
            error!(instance = %instance, channel = %channel, error = %e, "failed to join invited channel");
            return;
        }

        let my_nick = client.current_nick();
        if !self.manager.config().silent_join {
            let greeting = self
                .manager
                .config()
                .join_msg
                .clone()
                .unwrap_or_else(|| default_join_msg(&my_nick));
            let ctx = MessageContext::outbound(instance, &my_nick).with_destination(channel);
            match client.say(channel, &greeting).await {
                Ok(()) => self.hub.sent_message(channel, &greeting, &ctx).await,
                Err(e) => {
                    error!(instance = %instance, channel = %channel, error = %e, "failed to send greeting");
                }
            }
        }

        let next = self.manager.config().with_channel_added(channel);
        self.manager.apply_config(next);
        self.hub
            .save_config(self.manager.config(), instance, true)
            .await;
    }

    /// Returns `false` when the router should stop.
    async fn handle_outbound(&mut self, command: Outbound) -> bool {
        let Some(client) = self.manager.client().map(Arc::clone) else {
            return !matches!(command, Outbound::Disconnect { .. });
        };
        let instance = self.manager.instance_id().to_string();

        match command {
            Outbound::Say { to, text, ctx } => {
                let text = if ctx.no_prefix() || ctx.nick().is_empty() {
                    text
                } else {
                    format!("{}: {}", ctx.nick(), text)
                };
                let result = if ctx.is_action() {
                    client.act(&to, &text).await
                } else {
                    client.say(&to, &text).await
                };
                match result {
                    Ok(()) => self.hub.sent_message(&to, &text, &ctx).await,
                    Err(e) => {
                        error!(instance = %instance, target = %to, error = %e, "failed to deliver message");
                    }
                }
            }
            Outbound::Emote { to, text, ctx } => match client.act(&to, &text).await {
                Ok(()) => self.hub.sent_message(&to, &text, &ctx).await,
                Err(e) => {
                    error!(instance = %instance, target = %to, error = %e, "failed to deliver action");
                }
            },
            Outbound::Alert { text } => {
                let config = self.manager.config().clone();
                let my_nick = client.current_nick();
                for channel in &config.channels {
                    let subscribed = config
                        .channel_overrides(channel)
                        .is_some_and(|o| o.alert);
                    if !subscribed {
                        continue;
                    }
                    let ctx =
                        MessageContext::outbound(&instance, &my_nick).with_destination(channel);
                    match client.say(channel, &text).await {
                        Ok(()) => self.hub.sent_message(channel, &text, &ctx).await,
                        Err(e) => {
                            // One channel failing must not block the rest.
                            error!(instance = %instance, channel = %channel, error = %e, "failed to deliver alert");
                        }
                    }
                }
            }
            Outbound::Disconnect { message } => {
                self.manager.disconnect(message.as_deref()).await;
                return false;
            }
        }
        true
    }
}
