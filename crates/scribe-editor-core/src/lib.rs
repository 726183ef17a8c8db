//! Editor-side core for scribe documents.
//!
//! This crate provides:
//! - `Node`: the rich-text content tree and the stored-content parsing helpers
//! - `Fingerprint`: a fast 32-bit content digest used to skip no-op updates
//! - `EditorHandle`: the seam to a live editor, plus `MemoryEditor` for headless use
//! - `Scheduler` / `FlushQueue`: deferred work that runs after the host flushes
//! - `UpdateReconciler`: merges remote content into a live editor, keeping the selection

mod content;
mod editor;
mod error;
mod fingerprint;
mod reconcile;
mod schedule;
mod selection;

pub use content::{DEFAULT_PLACEHOLDER_TEXT, Mark, Node, decode_content, parse_content};
pub use editor::{EditorHandle, MemoryEditor};
pub use error::{ContentError, EditorError};
pub use fingerprint::{Fingerprint, fingerprint_json, fingerprint_str, hash_content};
pub use reconcile::UpdateReconciler;
pub use schedule::{FlushQueue, Scheduler, Task};
pub use selection::SelectionRange;
