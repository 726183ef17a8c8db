//! Loading and saving documents against a persistent store.
//!
//! Loads never fail for ordinary reasons: a missing row or an unreachable
//! store yields a placeholder document so the editor always has something to
//! show. `fetch` exposes the distinction for callers that care. Saves retry
//! with a linearly growing delay and report the outcome as a value.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use scribe_common::{SyncEvent, SyncObserver, TracingObserver};
use scribe_editor_core::{ContentError, Node, decode_content};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use smol_str::{SmolStr, format_smolstr};

use crate::SyncConfig;
use crate::error::{BackendError, StoreError};

/// A row in the documents table, as the store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    /// Stored as text; integer primary keys are accepted and stringified.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: SmolStr,
    #[serde(default)]
    pub title: Option<SmolStr>,
    /// JSON string or structured JSON.
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DocumentRow {
    /// A row that has never been updated.
    pub fn new(id: impl Into<SmolStr>, title: Option<&str>, content: Value) -> Self {
        Self {
            id: id.into(),
            title: title.map(SmolStr::from),
            content,
            updated_at: None,
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<SmolStr, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(id) => Ok(id.into()),
        Value::Number(id) => Ok(id.to_string().into()),
        other => Err(D::Error::custom(format_args!(
            "expected a string or number id, got {other}"
        ))),
    }
}

/// A decoded document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: SmolStr,
    /// Display name.
    pub name: SmolStr,
    pub content: Node,
}

/// Result of a fetch, keeping "not there" and "could not ask" apart.
#[derive(Debug)]
pub enum LoadOutcome {
    Found(Document),
    NotFound,
    Unavailable(BackendError),
}

/// Retry bookkeeping for a save in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    /// Already a retry; no further retries will be made.
    pub is_retry: bool,
    /// Retries used so far.
    pub retry_count: u32,
    pub max_retries: u32,
}

impl RetryState {
    pub fn new(max_retries: u32) -> Self {
        Self {
            is_retry: false,
            retry_count: 0,
            max_retries,
        }
    }
}

impl Default for RetryState {
    fn default() -> Self {
        Self::new(SyncConfig::DEFAULT_MAX_RETRIES)
    }
}

/// Outcome of `DocumentStore::save`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveResult {
    Saved,
    Failed { error: SmolStr, retry_count: u32 },
}

impl SaveResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    /// Retries used; zero on success.
    pub fn retry_count(&self) -> u32 {
        match self {
            Self::Saved => 0,
            Self::Failed { retry_count, .. } => *retry_count,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Saved => None,
            Self::Failed { error, .. } => Some(error.as_str()),
        }
    }
}

/// Row-level access to the document table.
pub trait StoreBackend {
    /// Fetch a single row by id. `Ok(None)` when no such row exists.
    fn fetch_document(
        &self,
        doc_id: &str,
    ) -> impl Future<Output = Result<Option<DocumentRow>, BackendError>>;

    /// Set `content` (a JSON string) and `updated_at` on the row with `doc_id`.
    fn update_document(
        &self,
        doc_id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), BackendError>>;
}

/// Document persistence with placeholder fallback and save retries.
///
/// Saves are not queued: two concurrent saves of one document race at the
/// store, which decides the winner.
pub struct DocumentStore<B> {
    backend: B,
    default_content: Node,
    max_retries: u32,
    retry_base_delay: Duration,
    observer: Arc<dyn SyncObserver>,
}

impl<B: StoreBackend> DocumentStore<B> {
    pub fn new(backend: B, config: &SyncConfig) -> Self {
        Self {
            backend,
            default_content: config.default_content.clone(),
            max_retries: config.max_retries,
            retry_base_delay: config.retry_base_delay,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The document shown when the store has nothing for `doc_id`.
    pub fn placeholder(&self, doc_id: &str) -> Document {
        Document {
            id: doc_id.into(),
            name: default_name(doc_id),
            content: self.default_content.clone(),
        }
    }

    /// Fetch and decode a document, reporting why nothing came back.
    ///
    /// Only malformed stored content is an error.
    pub async fn fetch(&self, doc_id: &str) -> Result<LoadOutcome, StoreError> {
        let row = match self.backend.fetch_document(doc_id).await {
            Ok(Some(row)) => row,
            Ok(None) => return Ok(LoadOutcome::NotFound),
            Err(e) => return Ok(LoadOutcome::Unavailable(e)),
        };

        let content = match decode_content(row.content) {
            Ok(node) => node,
            // a row created without content yet
            Err(ContentError::Empty) => self.default_content.clone(),
            Err(source) => {
                return Err(StoreError::MalformedContent {
                    doc_id: doc_id.into(),
                    source,
                });
            }
        };

        let name = row
            .title
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| default_name(doc_id));

        Ok(LoadOutcome::Found(Document {
            id: row.id,
            name,
            content,
        }))
    }

    /// Load a document, falling back to the placeholder.
    ///
    /// A missing row and an unreachable store both produce the placeholder;
    /// use `fetch` to tell them apart.
    pub async fn load(&self, doc_id: &str) -> Result<Document, StoreError> {
        let reason = match self.fetch(doc_id).await? {
            LoadOutcome::Found(doc) => {
                self.observer.on_event(&SyncEvent::Loaded {
                    doc_id: doc_id.into(),
                });
                return Ok(doc);
            }
            LoadOutcome::NotFound => SmolStr::new_static("not found"),
            LoadOutcome::Unavailable(e) => e.to_string().into(),
        };

        self.observer.on_event(&SyncEvent::LoadFallback {
            doc_id: doc_id.into(),
            reason,
        });
        Ok(self.placeholder(doc_id))
    }

    /// Content only, for callers that do not need the name.
    pub async fn load_content(&self, doc_id: &str) -> Result<Node, StoreError> {
        self.load(doc_id).await.map(|doc| doc.content)
    }

    /// Save `content`, retrying failures.
    ///
    /// Without a `retry` state the configured limit applies. A state with
    /// `is_retry` set gets exactly one attempt. Retry `n` waits
    /// `n * retry_base_delay` first.
    pub async fn save(&self, doc_id: &str, content: &Node, retry: Option<RetryState>) -> SaveResult {
        let RetryState {
            is_retry,
            mut retry_count,
            max_retries,
        } = retry.unwrap_or_else(|| RetryState::new(self.max_retries));
        let json = content.to_json_string();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let error = match self.backend.update_document(doc_id, &json, Utc::now()).await {
                Ok(()) => {
                    self.observer.on_event(&SyncEvent::Saved {
                        doc_id: doc_id.into(),
                        retry_count,
                    });
                    return SaveResult::Saved;
                }
                Err(e) => SmolStr::from(e.to_string()),
            };

            self.observer.on_event(&SyncEvent::SaveFailed {
                doc_id: doc_id.into(),
                attempt,
                error: error.clone(),
            });

            if is_retry || retry_count >= max_retries {
                self.observer.on_event(&SyncEvent::SaveAbandoned {
                    doc_id: doc_id.into(),
                    retry_count,
                    error: error.clone(),
                });
                return SaveResult::Failed { error, retry_count };
            }

            retry_count += 1;
            let delay = self.retry_base_delay * retry_count;
            self.observer.on_event(&SyncEvent::SaveRetry {
                doc_id: doc_id.into(),
                retry: retry_count,
                max_retries,
                delay,
            });
            tokio::time::sleep(delay).await;
        }
    }
}

fn default_name(doc_id: &str) -> SmolStr {
    format_smolstr!("Document {}", doc_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use scribe_common::RecordingObserver;
    use serde_json::json;
    use tokio::time::Instant;

    /// Backend with scripted responses.
    #[derive(Default)]
    struct ScriptedBackend {
        row: Option<DocumentRow>,
        fetch_fails: bool,
        /// Saves fail this many times, then succeed. `u32::MAX` never succeeds.
        save_failures: u32,
        save_attempts: AtomicU32,
        saved: Mutex<Vec<(SmolStr, String)>>,
    }

    impl StoreBackend for ScriptedBackend {
        async fn fetch_document(&self, _doc_id: &str) -> Result<Option<DocumentRow>, BackendError> {
            if self.fetch_fails {
                return Err(BackendError::Other("connection refused".into()));
            }
            Ok(self.row.clone())
        }

        async fn update_document(
            &self,
            doc_id: &str,
            content: &str,
            _updated_at: DateTime<Utc>,
        ) -> Result<(), BackendError> {
            let attempt = self.save_attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.save_failures {
                return Err(BackendError::Status {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            self.saved
                .lock()
                .unwrap()
                .push((doc_id.into(), content.to_string()));
            Ok(())
        }
    }

    fn store(backend: ScriptedBackend) -> (DocumentStore<ScriptedBackend>, RecordingObserver) {
        let recorder = RecordingObserver::new();
        let store = DocumentStore::new(backend, &SyncConfig::default())
            .with_observer(Arc::new(recorder.clone()));
        (store, recorder)
    }

    fn row(content: Value, title: Option<&str>) -> DocumentRow {
        DocumentRow {
            id: "42".into(),
            title: title.map(Into::into),
            content,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_load_parses_string_content() {
        let content = Node::placeholder("stored");
        let (store, recorder) = store(ScriptedBackend {
            row: Some(row(Value::String(content.to_json_string()), Some("Notes"))),
            ..Default::default()
        });

        let doc = store.load("42").await.unwrap();
        assert_eq!(doc.name, "Notes");
        assert_eq!(doc.content, content);
        assert_eq!(
            recorder.events(),
            vec![SyncEvent::Loaded {
                doc_id: "42".into()
            }]
        );
    }

    #[test]
    fn test_row_accepts_numeric_id() {
        let row: DocumentRow =
            serde_json::from_str(r#"{"id":42,"title":"Notes","content":null}"#).unwrap();
        assert_eq!(row.id, "42");
        assert_eq!(row.title.as_deref(), Some("Notes"));

        let row: DocumentRow = serde_json::from_value(json!({"id": "abc"})).unwrap();
        assert_eq!(row.id, "abc");

        assert!(serde_json::from_value::<DocumentRow>(json!({"id": true})).is_err());
    }

    #[tokio::test]
    async fn test_load_row_with_numeric_id() {
        let content = Node::placeholder("from integer key");
        let row: DocumentRow = serde_json::from_value(json!({
            "id": 42,
            "title": "Numbered",
            "content": content.to_json_string(),
        }))
        .unwrap();
        let (store, _) = store(ScriptedBackend {
            row: Some(row),
            ..Default::default()
        });

        let doc = store.load("42").await.unwrap();
        assert_eq!(doc.id, "42");
        assert_eq!(doc.name, "Numbered");
        assert_eq!(doc.content, content);
    }

    #[tokio::test]
    async fn test_load_passes_structured_content() {
        let (store, _) = store(ScriptedBackend {
            row: Some(row(
                json!({"type": "doc", "content": [{"type": "paragraph"}]}),
                None,
            )),
            ..Default::default()
        });

        let doc = store.load("42").await.unwrap();
        assert_eq!(doc.name, "Document 42");
        assert_eq!(doc.content, Node::doc(vec![Node::paragraph(vec![])]));
    }

    #[tokio::test]
    async fn test_load_error_returns_placeholder() {
        let (store, recorder) = store(ScriptedBackend {
            fetch_fails: true,
            ..Default::default()
        });

        let doc = store.load("7").await.unwrap();
        assert_eq!(doc.name, "Document 7");
        assert_eq!(doc.content, Node::placeholder("New doc"));
        assert_eq!(
            recorder.count(|e| matches!(e, SyncEvent::LoadFallback { .. })),
            1
        );
    }

    #[tokio::test]
    async fn test_load_missing_returns_placeholder() {
        let (store, _) = store(ScriptedBackend::default());
        let doc = store.load("9").await.unwrap();
        assert_eq!(doc, store.placeholder("9"));
    }

    #[tokio::test]
    async fn test_fetch_distinguishes_outcomes() {
        let (missing, _) = store(ScriptedBackend::default());
        assert!(matches!(missing.fetch("1").await.unwrap(), LoadOutcome::NotFound));

        let (down, _) = store(ScriptedBackend {
            fetch_fails: true,
            ..Default::default()
        });
        assert!(matches!(
            down.fetch("1").await.unwrap(),
            LoadOutcome::Unavailable(BackendError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_placeholder_comes_from_config() {
        let config = SyncConfig {
            default_content: Node::placeholder("Untitled"),
            ..Default::default()
        };
        let store = DocumentStore::new(ScriptedBackend::default(), &config);
        assert_eq!(store.load_content("3").await.unwrap().plain_text(), "Untitled");
    }

    #[tokio::test]
    async fn test_load_malformed_content_propagates() {
        let (store, _) = store(ScriptedBackend {
            row: Some(row(Value::String("{\"type\":".into()), Some("Broken"))),
            ..Default::default()
        });

        let err = store.load("42").await.unwrap_err();
        assert!(matches!(err, StoreError::MalformedContent { .. }));
    }

    #[tokio::test]
    async fn test_load_null_content_uses_placeholder_content() {
        let (store, _) = store(ScriptedBackend {
            row: Some(row(Value::Null, Some("Fresh"))),
            ..Default::default()
        });

        let doc = store.load("42").await.unwrap();
        assert_eq!(doc.name, "Fresh");
        assert_eq!(doc.content, Node::placeholder("New doc"));
    }

    #[tokio::test]
    async fn test_save_writes_json_string() {
        let (store, _) = store(ScriptedBackend::default());
        let content = Node::placeholder("saved");

        let result = store.save("42", &content, None).await;

        assert_eq!(result, SaveResult::Saved);
        let saved = store.backend().saved.lock().unwrap().clone();
        assert_eq!(saved, vec![("42".into(), content.to_json_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_gives_up_after_max_retries() {
        let (store, recorder) = store(ScriptedBackend {
            save_failures: u32::MAX,
            ..Default::default()
        });
        let started = Instant::now();

        let result = store
            .save("42", &Node::placeholder("x"), Some(RetryState::new(3)))
            .await;

        assert!(!result.is_success());
        assert_eq!(result.retry_count(), 3);
        assert_eq!(result.error(), Some("store returned 503: unavailable"));
        assert_eq!(store.backend().save_attempts.load(Ordering::SeqCst), 4);
        // 1s + 2s + 3s
        assert_eq!(started.elapsed(), Duration::from_secs(6));

        let delays: Vec<Duration> = recorder
            .events()
            .into_iter()
            .filter_map(|e| match e {
                SyncEvent::SaveRetry { delay, .. } => Some(delay),
                _ => None,
            })
            .collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(3)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_recovers_after_failures() {
        let (store, _) = store(ScriptedBackend {
            save_failures: 2,
            ..Default::default()
        });

        let result = store.save("42", &Node::placeholder("x"), None).await;

        assert_eq!(result, SaveResult::Saved);
        assert_eq!(result.retry_count(), 0);
        assert_eq!(store.backend().save_attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_marked_retry_makes_one_attempt() {
        let (store, _) = store(ScriptedBackend {
            save_failures: u32::MAX,
            ..Default::default()
        });
        let retry = RetryState {
            is_retry: true,
            retry_count: 1,
            max_retries: 3,
        };

        let result = store.save("42", &Node::placeholder("x"), Some(retry)).await;

        assert_eq!(result.retry_count(), 1);
        assert_eq!(store.backend().save_attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_with_zero_retries() {
        let (store, recorder) = store(ScriptedBackend {
            save_failures: 1,
            ..Default::default()
        });

        let result = store
            .save("42", &Node::placeholder("x"), Some(RetryState::new(0)))
            .await;

        assert_eq!(result.retry_count(), 0);
        assert!(!result.is_success());
        assert_eq!(
            recorder.count(|e| matches!(e, SyncEvent::SaveAbandoned { .. })),
            1
        );
    }
}
