//! Observer interface for sync and reconciliation events.
//!
//! Components never log directly to a global sink. They report a `SyncEvent`
//! to whatever `SyncObserver` the host injected. `TracingObserver` is the
//! default and forwards everything to `tracing`; tests swap in a
//! `RecordingObserver` to assert on failures without capturing output.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use smol_str::SmolStr;

/// Something worth telling the host about.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum SyncEvent {
    /// A document row was found and decoded.
    Loaded { doc_id: SmolStr },
    /// The store had nothing usable; the placeholder document was returned.
    LoadFallback { doc_id: SmolStr, reason: SmolStr },
    /// A save attempt succeeded.
    Saved { doc_id: SmolStr, retry_count: u32 },
    /// A single save attempt failed. `attempt` is 1-based.
    SaveFailed {
        doc_id: SmolStr,
        attempt: u32,
        error: SmolStr,
    },
    /// Another save attempt will be made after `delay`.
    SaveRetry {
        doc_id: SmolStr,
        retry: u32,
        max_retries: u32,
        delay: Duration,
    },
    /// Retries are exhausted (or were not allowed); the save is given up.
    SaveAbandoned {
        doc_id: SmolStr,
        retry_count: u32,
        error: SmolStr,
    },
    /// Incoming content hashed to the current fingerprint.
    UpdateSkipped { fingerprint: i32 },
    /// Incoming content replaced the editor document.
    UpdateApplied { previous: i32, current: i32 },
    /// The editor refused the content replacement.
    ApplyFailed { error: SmolStr },
    /// Selection was put back after a content swap.
    SelectionRestored { from: usize, to: usize },
    /// Selection restoration did not happen.
    SelectionSkipped { reason: SmolStr },
    /// The realtime channel reported a new status.
    StatusChanged { raw: SmolStr, status: SmolStr },
    /// Full presence roster received.
    PresenceSynced { members: usize },
    /// One or more presences arrived under `key`.
    PresenceJoined { key: SmolStr, count: usize },
    /// One or more presences left under `key`.
    PresenceLeft { key: SmolStr, count: usize },
}

/// Receives events from scribe components.
pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent);
}

impl<F> SyncObserver for F
where
    F: Fn(&SyncEvent) + Send + Sync,
{
    fn on_event(&self, event: &SyncEvent) {
        self(event)
    }
}

/// Default observer: turns events into `tracing` records.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent) {
        match event {
            SyncEvent::Loaded { doc_id } => tracing::debug!(%doc_id, "document loaded"),
            SyncEvent::LoadFallback { doc_id, reason } => {
                tracing::error!(%doc_id, %reason, "failed to load document, using placeholder")
            }
            SyncEvent::Saved {
                doc_id,
                retry_count,
            } => tracing::debug!(%doc_id, retry_count, "document saved"),
            SyncEvent::SaveFailed {
                doc_id,
                attempt,
                error,
            } => tracing::warn!(%doc_id, attempt, %error, "save attempt failed"),
            SyncEvent::SaveRetry {
                doc_id,
                retry,
                max_retries,
                delay,
            } => tracing::info!(
                %doc_id,
                retry,
                max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying save"
            ),
            SyncEvent::SaveAbandoned {
                doc_id,
                retry_count,
                error,
            } => tracing::error!(%doc_id, retry_count, %error, "giving up on save"),
            SyncEvent::UpdateSkipped { fingerprint } => {
                tracing::trace!(fingerprint, "remote update matches current content")
            }
            SyncEvent::UpdateApplied { previous, current } => {
                tracing::debug!(previous, current, "applied remote update")
            }
            SyncEvent::ApplyFailed { error } => {
                tracing::error!(%error, "failed to apply remote update")
            }
            SyncEvent::SelectionRestored { from, to } => {
                tracing::trace!(from, to, "selection restored")
            }
            SyncEvent::SelectionSkipped { reason } => {
                tracing::trace!(%reason, "selection not restored")
            }
            SyncEvent::StatusChanged { raw, status } => {
                tracing::info!(%raw, %status, "realtime status")
            }
            SyncEvent::PresenceSynced { members } => {
                tracing::debug!(members, "presence sync")
            }
            SyncEvent::PresenceJoined { key, count } => {
                tracing::debug!(%key, count, "presence join")
            }
            SyncEvent::PresenceLeft { key, count } => {
                tracing::debug!(%key, count, "presence leave")
            }
        }
    }
}

/// Keeps every event in memory.
///
/// Cloning shares the underlying buffer, so a clone can be handed to a
/// component while the original is kept for inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<SyncEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<SyncEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&SyncEvent) -> bool) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| predicate(e))
            .count()
    }

    pub fn clear(&self) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl SyncObserver for RecordingObserver {
    fn on_event(&self, event: &SyncEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
