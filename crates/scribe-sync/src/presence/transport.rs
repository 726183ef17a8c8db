use std::future::Future;

use n0_future::boxed::BoxStream;

use super::types::{ChannelConfig, PresenceRecord, PresenceState, TransportEvent};
use crate::error::TransportError;

/// A realtime service that can open document channels.
///
/// Reconnection and subscription retries are the transport's business.
pub trait RealtimeTransport {
    type Subscription: ChannelSubscription;

    /// Open a channel. Returns the subscription handle and its event stream.
    fn subscribe(
        &self,
        config: &ChannelConfig,
    ) -> impl Future<Output = Result<(Self::Subscription, BoxStream<TransportEvent>), TransportError>>;
}

/// An open channel. Dropping it leaves the channel.
pub trait ChannelSubscription {
    /// Current roster of the channel.
    fn presence_state(&self) -> PresenceState;

    /// Publish (or refresh) this client's presence.
    fn track(&self, record: PresenceRecord) -> impl Future<Output = Result<(), TransportError>>;
}
