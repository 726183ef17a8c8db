//! In-memory `StoreBackend`, optionally publishing updates to a `LocalHub`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::Value;
use smol_str::SmolStr;

use crate::SyncConfig;
use crate::error::BackendError;
use crate::presence::{LocalHub, RowChange};
use crate::store::{DocumentRow, StoreBackend};

/// Document rows kept in process. Clones share the same rows.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    rows: Arc<Mutex<HashMap<SmolStr, DocumentRow>>>,
    offline: Arc<AtomicBool>,
    hub: Option<LocalHub>,
    table: SmolStr,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            rows: Default::default(),
            offline: Default::default(),
            hub: None,
            table: SyncConfig::DEFAULT_TABLE.into(),
        }
    }

    /// Publish an `UPDATE` row change on `hub` after every successful update.
    pub fn with_hub(mut self, hub: LocalHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn with_table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = table.into();
        self
    }

    fn rows(&self) -> MutexGuard<'_, HashMap<SmolStr, DocumentRow>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, row: DocumentRow) {
        self.rows().insert(row.id.clone(), row);
    }

    pub fn get(&self, doc_id: &str) -> Option<DocumentRow> {
        self.rows().get(doc_id).cloned()
    }

    /// While offline every request fails.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), BackendError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Other("store is offline".into()));
        }
        Ok(())
    }
}

impl StoreBackend for MemoryBackend {
    async fn fetch_document(&self, doc_id: &str) -> Result<Option<DocumentRow>, BackendError> {
        self.check_online()?;
        Ok(self.get(doc_id))
    }

    /// Like a filtered PATCH, updating a missing row changes nothing.
    async fn update_document(
        &self,
        doc_id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        self.check_online()?;

        let updated = {
            let mut rows = self.rows();
            let Some(row) = rows.get_mut(doc_id) else {
                tracing::debug!(doc_id, "update matched no rows");
                return Ok(());
            };
            row.content = Value::String(content.to_string());
            row.updated_at = Some(updated_at);
            row.clone()
        };

        if let Some(hub) = &self.hub {
            hub.publish_row_change(RowChange::update(self.table.clone(), updated));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presence::{ChannelConfig, RealtimeTransport, TransportEvent};
    use n0_future::StreamExt;

    #[tokio::test]
    async fn test_update_stores_string_content() {
        let backend = MemoryBackend::new();
        backend.insert(DocumentRow::new("1", Some("One"), Value::Null));

        let now = Utc::now();
        backend.update_document("1", "{\"type\":\"doc\"}", now).await.unwrap();

        let row = backend.get("1").unwrap();
        assert_eq!(row.content, Value::String("{\"type\":\"doc\"}".into()));
        assert_eq!(row.updated_at, Some(now));
        assert_eq!(row.title.as_deref(), Some("One"));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_noop() {
        let backend = MemoryBackend::new();
        backend.update_document("9", "{}", Utc::now()).await.unwrap();
        assert!(backend.get("9").is_none());
        assert!(backend.fetch_document("9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_offline_fails_requests() {
        let backend = MemoryBackend::new();
        backend.set_offline(true);
        assert!(backend.fetch_document("1").await.is_err());
        assert!(backend.update_document("1", "{}", Utc::now()).await.is_err());

        backend.set_offline(false);
        assert!(backend.fetch_document("1").await.is_ok());
    }

    #[tokio::test]
    async fn test_update_publishes_row_change() {
        let hub = LocalHub::new();
        let backend = MemoryBackend::new().with_hub(hub.clone());
        backend.insert(DocumentRow::new("1", None, Value::Null));

        let config = ChannelConfig::for_document("1", "a", "documents");
        let (_sub, mut events) = hub.subscribe(&config).await.unwrap();
        events.next().await;

        backend.update_document("1", "{}", Utc::now()).await.unwrap();

        match events.next().await {
            Some(TransportEvent::RowChange(change)) => {
                assert_eq!(change.event, "UPDATE");
                assert_eq!(change.new.content, Value::String("{}".into()));
            }
            other => panic!("expected row change, got {other:?}"),
        }
    }
}
