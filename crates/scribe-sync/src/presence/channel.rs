//! Document channel: dispatches transport events to a `ChannelHandler`.

use std::sync::Arc;

use n0_future::StreamExt;
use n0_future::boxed::BoxStream;
use scribe_common::{SyncEvent, SyncObserver, TracingObserver};
use smol_str::SmolStr;

use super::status::ConnectionStatus;
use super::transport::{ChannelSubscription, RealtimeTransport};
use super::types::{ChannelConfig, PresenceRecord, PresenceState, TransportEvent};
use crate::SyncConfig;
use crate::error::TransportError;
use crate::store::DocumentRow;

/// Callbacks for a document channel. Every method defaults to doing nothing.
pub trait ChannelHandler {
    /// The document row changed remotely.
    fn on_content_update(&mut self, _row: &DocumentRow) {}

    /// Full roster; `count` is the number of distinct presence keys.
    fn on_presence_sync(&mut self, _state: &PresenceState, _count: usize) {}

    fn on_presence_join(&mut self, _key: &str, _new_presences: &[PresenceRecord]) {}

    fn on_presence_leave(&mut self, _key: &str, _left_presences: &[PresenceRecord]) {}

    fn on_status_change(&mut self, _status: ConnectionStatus, _raw: &str, _error: Option<&str>) {}
}

/// Handler that ignores everything.
impl ChannelHandler for () {}

/// A subscribed document channel: row changes in, presence both ways.
pub struct PresenceChannel<S, H> {
    config: ChannelConfig,
    subscription: S,
    events: BoxStream<TransportEvent>,
    handler: H,
    status: ConnectionStatus,
    user_agent: SmolStr,
    observer: Arc<dyn SyncObserver>,
}

impl<S, H> PresenceChannel<S, H>
where
    S: ChannelSubscription,
    H: ChannelHandler,
{
    /// Open channel `doc-<doc_id>` with presence keyed by `client_id`.
    pub async fn subscribe<T>(
        transport: &T,
        doc_id: &str,
        client_id: &str,
        handler: H,
        sync: &SyncConfig,
    ) -> Result<Self, TransportError>
    where
        T: RealtimeTransport<Subscription = S>,
    {
        let config = ChannelConfig::for_document(doc_id, client_id, &sync.table);
        let (subscription, events) = transport.subscribe(&config).await?;
        tracing::debug!(channel = %config.name, "document channel opened");

        Ok(Self {
            config,
            subscription,
            events,
            handler,
            status: ConnectionStatus::default(),
            user_agent: sync.user_agent.clone(),
            observer: Arc::new(TracingObserver),
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn presence_state(&self) -> PresenceState {
        self.subscription.presence_state()
    }

    /// Wait for one transport event and dispatch it.
    ///
    /// Returns `false` once the transport has closed the stream.
    pub async fn next(&mut self) -> bool {
        match self.events.next().await {
            Some(event) => {
                self.dispatch(event);
                true
            }
            None => false,
        }
    }

    /// Dispatch events until the transport closes the stream.
    pub async fn run(&mut self) {
        while self.next().await {}
        tracing::debug!(channel = %self.config.name, "document channel ended");
    }

    /// Announce this client on the channel.
    pub async fn broadcast_presence(
        &self,
        client_id: &str,
        user_name: Option<&str>,
    ) -> Result<(), TransportError> {
        let record = PresenceRecord::new(client_id, &self.user_agent, user_name);
        self.subscription.track(record).await
    }

    fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::RowChange(change) => {
                self.handler.on_content_update(&change.new);
            }
            TransportEvent::PresenceSync => {
                let state = self.subscription.presence_state();
                let members = state.len();
                self.observer.on_event(&SyncEvent::PresenceSynced { members });
                self.handler.on_presence_sync(&state, members);
            }
            TransportEvent::PresenceJoin { key, new_presences } => {
                self.observer.on_event(&SyncEvent::PresenceJoined {
                    key: key.clone(),
                    count: new_presences.len(),
                });
                self.handler.on_presence_join(&key, &new_presences);
            }
            TransportEvent::PresenceLeave { key, left_presences } => {
                self.observer.on_event(&SyncEvent::PresenceLeft {
                    key: key.clone(),
                    count: left_presences.len(),
                });
                self.handler.on_presence_leave(&key, &left_presences);
            }
            TransportEvent::Status { status: raw, error } => {
                let status = ConnectionStatus::from_transport(&raw);
                self.status = status;
                self.observer.on_event(&SyncEvent::StatusChanged {
                    raw: raw.clone(),
                    status: status.as_str().into(),
                });
                self.handler.on_status_change(status, &raw, error.as_deref());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::local::{LocalHub, LocalSubscription};
    use crate::presence::types::RowChange;
    use scribe_common::RecordingObserver;
    use serde_json::Value;

    #[derive(Default)]
    struct Recorder {
        updates: Vec<SmolStr>,
        syncs: Vec<usize>,
        joins: Vec<SmolStr>,
        leaves: Vec<SmolStr>,
        statuses: Vec<(ConnectionStatus, Option<SmolStr>)>,
    }

    impl ChannelHandler for Recorder {
        fn on_content_update(&mut self, row: &DocumentRow) {
            self.updates.push(row.id.clone());
        }

        fn on_presence_sync(&mut self, _state: &PresenceState, count: usize) {
            self.syncs.push(count);
        }

        fn on_presence_join(&mut self, key: &str, _new_presences: &[PresenceRecord]) {
            self.joins.push(key.into());
        }

        fn on_presence_leave(&mut self, key: &str, _left_presences: &[PresenceRecord]) {
            self.leaves.push(key.into());
        }

        fn on_status_change(&mut self, status: ConnectionStatus, _raw: &str, error: Option<&str>) {
            self.statuses.push((status, error.map(SmolStr::from)));
        }
    }

    type Channel<H> = PresenceChannel<LocalSubscription, H>;

    async fn open<H: ChannelHandler>(hub: &LocalHub, client_id: &str, handler: H) -> Channel<H> {
        PresenceChannel::subscribe(hub, "42", client_id, handler, &SyncConfig::default())
            .await
            .unwrap()
    }

    async fn pump<H: ChannelHandler>(channel: &mut Channel<H>, events: usize) {
        for _ in 0..events {
            assert!(channel.next().await);
        }
    }

    #[tokio::test]
    async fn test_status_follows_transport() {
        let hub = LocalHub::new();
        let mut channel = open(&hub, "a", Recorder::default()).await;
        assert_eq!(channel.status(), ConnectionStatus::Connecting);
        assert_eq!(channel.name(), "doc-42");

        pump(&mut channel, 1).await;
        assert_eq!(channel.status(), ConnectionStatus::Connected);

        hub.fail_channel("doc-42", "lost");
        pump(&mut channel, 1).await;
        assert_eq!(channel.status(), ConnectionStatus::Error);

        hub.close();
        channel.run().await;
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
        assert_eq!(
            channel.handler().statuses,
            vec![
                (ConnectionStatus::Connected, None),
                (ConnectionStatus::Error, Some("lost".into())),
                (ConnectionStatus::Disconnected, None),
            ]
        );
    }

    #[tokio::test]
    async fn test_presence_roster_counts_keys() {
        let hub = LocalHub::new();
        let recorder = RecordingObserver::new();
        let mut alice = open(&hub, "alice", Recorder::default())
            .await
            .with_observer(Arc::new(recorder.clone()));
        let mut bob = open(&hub, "bob", Recorder::default()).await;

        alice.broadcast_presence("alice", Some("Alice")).await.unwrap();
        bob.broadcast_presence("bob", None).await.unwrap();
        // SUBSCRIBED, join alice, sync, join bob, sync
        pump(&mut alice, 5).await;
        // SUBSCRIBED, join alice, sync, join bob, sync
        pump(&mut bob, 5).await;

        assert_eq!(alice.handler().joins, vec!["alice", "bob"]);
        assert_eq!(alice.handler().syncs, vec![2, 2]);
        assert_eq!(alice.presence_state()["alice"][0].user_name.as_deref(), Some("Alice"));
        assert_eq!(
            recorder.count(|e| matches!(e, SyncEvent::PresenceSynced { members: 2 })),
            2
        );

        drop(bob);
        pump(&mut alice, 2).await;
        assert_eq!(alice.handler().leaves, vec!["bob"]);
        assert_eq!(alice.handler().syncs.last(), Some(&1));
    }

    #[tokio::test]
    async fn test_row_changes_reach_handler() {
        let hub = LocalHub::new();
        let mut channel = open(&hub, "a", Recorder::default()).await;
        pump(&mut channel, 1).await;

        let row = DocumentRow {
            id: "42".into(),
            title: None,
            content: Value::Null,
            updated_at: None,
        };
        hub.publish_row_change(RowChange::update("documents", row.clone()));
        hub.publish_row_change(RowChange::update(
            "documents",
            DocumentRow {
                id: "7".into(),
                ..row
            },
        ));
        hub.close();
        channel.run().await;

        assert_eq!(channel.handler().updates, vec!["42"]);
    }

    #[tokio::test]
    async fn test_unit_handler_ignores_events() {
        let hub = LocalHub::new();
        let mut channel = open(&hub, "a", ()).await;
        channel.broadcast_presence("a", None).await.unwrap();
        hub.close();
        channel.run().await;
        assert_eq!(channel.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_presence_uses_configured_user_agent() {
        let hub = LocalHub::new();
        let sync = SyncConfig {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko)".into(),
            ..Default::default()
        };
        let channel = PresenceChannel::subscribe(&hub, "42", "a", (), &sync).await.unwrap();
        channel.broadcast_presence("a", None).await.unwrap();

        let state = channel.presence_state();
        let agent = &state["a"][0].user_agent;
        assert_eq!(agent.chars().count(), 50);
        assert!(sync.user_agent.starts_with(agent.as_str()));
    }
}
