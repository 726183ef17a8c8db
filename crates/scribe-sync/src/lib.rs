//! Persistence and realtime plumbing for scribe documents.
//!
//! - `DocumentStore` loads documents (falling back to a placeholder) and saves
//!   them with bounded, linearly spaced retries.
//! - `PostgrestBackend` and `MemoryBackend` are the stock `StoreBackend`s.
//! - `Debouncer` collapses bursts of edits into one save.
//! - `presence` subscribes to a document channel for remote changes and the
//!   roster of connected clients.

pub mod config;
pub mod debounce;
pub mod error;
pub mod memory;
pub mod postgrest;
pub mod presence;
pub mod store;

pub use config::SyncConfig;
pub use debounce::{Debouncer, debounce};
pub use error::{BackendError, ConfigError, StoreError, TransportError};
pub use memory::MemoryBackend;
pub use postgrest::PostgrestBackend;
pub use presence::{ChannelHandler, ConnectionStatus, LocalHub, PresenceChannel};
pub use store::{Document, DocumentRow, DocumentStore, LoadOutcome, RetryState, SaveResult, StoreBackend};
