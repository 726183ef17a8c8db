//! In-process realtime transport.
//!
//! Every subscriber shares one `LocalHub`. Presence, joins, leaves and row
//! changes are delivered over unbounded channels, so a host driving several
//! editors in one process (or a test) sees the same event sequence a hosted
//! realtime service would produce.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use n0_future::boxed::BoxStream;
use n0_future::stream;
use smol_str::SmolStr;
use tokio::sync::mpsc;

use super::transport::{ChannelSubscription, RealtimeTransport};
use super::types::{ChannelConfig, PresenceRecord, PresenceState, RowChange, TransportEvent};
use crate::error::TransportError;

#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    inner: Arc<Mutex<HubState>>,
}

#[derive(Debug, Default)]
struct HubState {
    channels: HashMap<SmolStr, Vec<Member>>,
    next_id: u64,
    closed: bool,
}

#[derive(Debug)]
struct Member {
    id: u64,
    config: ChannelConfig,
    tx: mpsc::UnboundedSender<TransportEvent>,
    records: Vec<PresenceRecord>,
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver a row change to every subscriber whose filter accepts it.
    ///
    /// Returns the number of subscribers notified.
    pub fn publish_row_change(&self, change: RowChange) -> usize {
        let state = self.lock();
        let mut delivered = 0;
        for member in state.channels.values().flatten() {
            if member.config.changes.matches(&change)
                && member.tx.send(TransportEvent::RowChange(change.clone())).is_ok()
            {
                delivered += 1;
            }
        }
        tracing::trace!(table = %change.table, id = %change.new.id, delivered, "row change published");
        delivered
    }

    /// Report a channel error to everyone on `channel`.
    pub fn fail_channel(&self, channel: &str, message: &str) {
        let state = self.lock();
        if let Some(members) = state.channels.get(channel) {
            broadcast(
                members,
                &TransportEvent::Status {
                    status: "CHANNEL_ERROR".into(),
                    error: Some(message.into()),
                },
            );
        }
    }

    /// Shut the hub down. Every subscriber sees `CLOSED`, then its stream ends.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        for members in state.channels.values() {
            broadcast(members, &TransportEvent::status("CLOSED"));
        }
        state.channels.clear();
        tracing::debug!("local hub closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Open subscriptions on `channel`.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.lock().channels.get(channel).map_or(0, Vec::len)
    }

    pub fn presence_state(&self, channel: &str) -> PresenceState {
        self.lock()
            .channels
            .get(channel)
            .map(|members| roster(members))
            .unwrap_or_default()
    }

    fn track(&self, channel: &str, member_id: u64, record: PresenceRecord) -> Result<(), TransportError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let members = state
            .channels
            .get_mut(channel)
            .ok_or(TransportError::Closed)?;
        let member = members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or(TransportError::Closed)?;

        let key = member.config.presence_key.clone();
        member.records = vec![record.clone()];

        broadcast(
            members,
            &TransportEvent::PresenceJoin {
                key,
                new_presences: vec![record],
            },
        );
        broadcast(members, &TransportEvent::PresenceSync);
        Ok(())
    }

    fn leave(&self, channel: &str, member_id: u64) {
        let mut state = self.lock();
        let Some(members) = state.channels.get_mut(channel) else {
            return;
        };
        let Some(index) = members.iter().position(|m| m.id == member_id) else {
            return;
        };

        let member = members.remove(index);
        if !member.records.is_empty() {
            broadcast(
                members,
                &TransportEvent::PresenceLeave {
                    key: member.config.presence_key,
                    left_presences: member.records,
                },
            );
            broadcast(members, &TransportEvent::PresenceSync);
        }
        if members.is_empty() {
            state.channels.remove(channel);
        }
    }
}

impl RealtimeTransport for LocalHub {
    type Subscription = LocalSubscription;

    async fn subscribe(
        &self,
        config: &ChannelConfig,
    ) -> Result<(LocalSubscription, BoxStream<TransportEvent>), TransportError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let member_id = {
            let mut state = self.lock();
            if state.closed {
                return Err(TransportError::Subscribe {
                    channel: config.name.clone(),
                    message: "hub is closed".into(),
                });
            }
            state.next_id += 1;
            let id = state.next_id;
            // receiver is alive, send cannot fail
            let _ = tx.send(TransportEvent::status("SUBSCRIBED"));
            state
                .channels
                .entry(config.name.clone())
                .or_default()
                .push(Member {
                    id,
                    config: config.clone(),
                    tx,
                    records: Vec::new(),
                });
            id
        };

        tracing::debug!(channel = %config.name, member_id, "subscribed to local channel");

        let subscription = LocalSubscription {
            hub: self.clone(),
            channel: config.name.clone(),
            member_id,
        };
        Ok((subscription, event_stream(rx)))
    }
}

/// A `LocalHub` channel membership. Dropping it leaves the channel.
#[derive(Debug)]
pub struct LocalSubscription {
    hub: LocalHub,
    channel: SmolStr,
    member_id: u64,
}

impl LocalSubscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl ChannelSubscription for LocalSubscription {
    fn presence_state(&self) -> PresenceState {
        self.hub.presence_state(&self.channel)
    }

    async fn track(&self, record: PresenceRecord) -> Result<(), TransportError> {
        self.hub.track(&self.channel, self.member_id, record)
    }
}

impl Drop for LocalSubscription {
    fn drop(&mut self) {
        self.hub.leave(&self.channel, self.member_id);
    }
}

fn event_stream(rx: mpsc::UnboundedReceiver<TransportEvent>) -> BoxStream<TransportEvent> {
    let stream = stream::unfold(rx, |mut rx| async move {
        let event = rx.recv().await?;
        Some((event, rx))
    });
    Box::pin(stream)
}

fn broadcast(members: &[Member], event: &TransportEvent) {
    for member in members {
        // a dropped receiver just means that member stopped listening
        let _ = member.tx.send(event.clone());
    }
}

fn roster(members: &[Member]) -> PresenceState {
    let mut state = PresenceState::new();
    for member in members.iter().filter(|m| !m.records.is_empty()) {
        state
            .entry(member.config.presence_key.clone())
            .or_default()
            .extend(member.records.iter().cloned());
    }
    state
}
