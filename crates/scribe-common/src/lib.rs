//! Shared plumbing for the scribe crates.
//!
//! - `observer`: structured events emitted by the store, reconciler and
//!   presence channel, plus the `SyncObserver` trait hosts implement to see them
//! - `telemetry`: tracing subscriber setup for host applications

pub mod observer;
pub mod telemetry;

pub use observer::{RecordingObserver, SyncEvent, SyncObserver, TracingObserver};
pub use smol_str::SmolStr;
