//! Realtime presence and change notifications for a document.
//!
//! `PresenceChannel` drives a `RealtimeTransport` subscription: row changes
//! go to the content-update callback, presence events to the roster
//! callbacks, and raw transport statuses are mapped to `ConnectionStatus`.
//! `LocalHub` is an in-process transport for tests and single-process hosts.

mod channel;
pub mod local;
mod status;
mod transport;
mod types;

pub use channel::{ChannelHandler, PresenceChannel};
pub use local::{LocalHub, LocalSubscription};
pub use status::ConnectionStatus;
pub use transport::{ChannelSubscription, RealtimeTransport};
pub use types::{
    ChangeFilter, ChannelConfig, PresenceRecord, PresenceState, RowChange, TransportEvent,
    USER_AGENT_MAX_UNITS,
};
