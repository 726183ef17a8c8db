//! Error types for content decoding and editor commands.

use miette::Diagnostic;
use smol_str::SmolStr;
use thiserror::Error;

/// Stored content could not be turned into a node tree.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ContentError {
    /// The content string is not valid JSON, or the JSON is not a node.
    #[error("malformed content JSON: {0}")]
    #[diagnostic(code(scribe::content::json))]
    Json(#[from] serde_json::Error),

    /// The stored value was null.
    #[error("content is empty")]
    #[diagnostic(code(scribe::content::empty))]
    Empty,
}

/// An editor command failed.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum EditorError {
    /// The editor has been torn down.
    #[error("editor has been destroyed")]
    #[diagnostic(code(scribe::editor::destroyed))]
    Destroyed,

    /// Content replacement was rejected.
    #[error("failed to replace content: {0}")]
    #[diagnostic(code(scribe::editor::set_content))]
    SetContent(SmolStr),

    /// Selection falls outside the document.
    #[error("selection {from}..{to} is outside document of size {size}")]
    #[diagnostic(code(scribe::editor::selection))]
    SelectionOutOfRange { from: usize, to: usize, size: usize },
}
