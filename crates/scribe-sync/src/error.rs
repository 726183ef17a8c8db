//! Error types for storage, transport and configuration.

use miette::Diagnostic;
use scribe_editor_core::ContentError;
use smol_str::SmolStr;
use thiserror::Error;

/// A storage backend request failed.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum BackendError {
    /// Transport-level HTTP failure.
    #[error(transparent)]
    #[diagnostic(code(scribe::store::http))]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("store returned {status}: {body}")]
    #[diagnostic(code(scribe::store::status))]
    Status { status: u16, body: SmolStr },

    /// Could not build the request URL.
    #[error("invalid store URL: {0}")]
    #[diagnostic(code(scribe::store::url))]
    Url(SmolStr),

    /// Anything else a backend wants to report.
    #[error("{0}")]
    #[diagnostic(code(scribe::store::backend))]
    Other(SmolStr),
}

/// Errors surfaced by `DocumentStore`.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum StoreError {
    /// The stored row exists but its content is not a valid node tree.
    #[error("stored content for document {doc_id} is malformed")]
    #[diagnostic(code(scribe::store::malformed))]
    MalformedContent {
        doc_id: SmolStr,
        #[source]
        source: ContentError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),
}

/// Realtime transport failures.
#[derive(Error, Debug, Diagnostic)]
#[diagnostic(code(scribe::transport))]
#[non_exhaustive]
pub enum TransportError {
    #[error("failed to subscribe to channel {channel}: {message}")]
    Subscribe { channel: SmolStr, message: SmolStr },

    #[error("failed to track presence: {0}")]
    Track(SmolStr),

    #[error("channel closed")]
    Closed,
}

/// Configuration could not be read from the environment.
#[derive(Error, Debug, Diagnostic)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("missing environment variable {var}")]
    #[diagnostic(code(scribe::config::missing))]
    MissingEnv { var: &'static str },

    #[error("invalid value for {var}: {message}")]
    #[diagnostic(code(scribe::config::invalid))]
    InvalidValue { var: &'static str, message: SmolStr },

    #[error("failed to parse URL {url}: {message}")]
    #[diagnostic(code(scribe::config::url))]
    UrlParse { url: String, message: SmolStr },
}
