//! Runtime settings for the store, debouncer and presence channel.

use std::time::Duration;

use scribe_editor_core::{DEFAULT_PLACEHOLDER_TEXT, Node};
use smol_str::SmolStr;
use url::Url;

use crate::error::ConfigError;

/// Settings shared by the store, debouncer and presence channel.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base URL of the REST store (e.g. `https://xyz.supabase.co`).
    pub store_url: Option<Url>,
    /// API key sent as `apikey` and bearer token.
    pub store_key: Option<SmolStr>,
    /// Table holding document rows.
    pub table: SmolStr,
    /// Retries after the first failed save.
    pub max_retries: u32,
    /// Delay unit for save retries; retry `n` waits `n * retry_base_delay`.
    pub retry_base_delay: Duration,
    /// Quiet period before a local edit is saved.
    pub debounce_delay: Duration,
    /// Client description included in presence records.
    pub user_agent: SmolStr,
    /// Content of a document the store could not provide.
    pub default_content: Node,
}

impl SyncConfig {
    pub const DEFAULT_TABLE: &'static str = "documents";
    pub const DEFAULT_MAX_RETRIES: u32 = 3;
    pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(1000);
    pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(300);

    /// Load configuration from environment variables.
    ///
    /// All optional:
    /// - `SCRIBE_STORE_URL`: REST store base URL
    /// - `SCRIBE_STORE_KEY`: REST store API key
    /// - `SCRIBE_TABLE`: document table (default: documents)
    /// - `SCRIBE_MAX_RETRIES`: save retries (default: 3)
    /// - `SCRIBE_RETRY_BASE_MS`: retry delay unit in ms (default: 1000)
    /// - `SCRIBE_DEBOUNCE_MS`: save debounce in ms (default: 300)
    /// - `SCRIBE_USER_AGENT`: presence user agent
    /// - `SCRIBE_PLACEHOLDER_TEXT`: text of the fallback document (default: New doc)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let store_url = lookup("SCRIBE_STORE_URL")
            .map(|url| {
                Url::parse(&url).map_err(|e| ConfigError::UrlParse {
                    message: e.to_string().into(),
                    url,
                })
            })
            .transpose()?;

        let max_retries = parse_var(&lookup, "SCRIBE_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
        let retry_base_delay = parse_var(&lookup, "SCRIBE_RETRY_BASE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry_base_delay);
        let debounce_delay = parse_var(&lookup, "SCRIBE_DEBOUNCE_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.debounce_delay);

        Ok(Self {
            store_url,
            store_key: lookup("SCRIBE_STORE_KEY").map(Into::into),
            table: lookup("SCRIBE_TABLE").map(Into::into).unwrap_or(defaults.table),
            max_retries,
            retry_base_delay,
            debounce_delay,
            user_agent: lookup("SCRIBE_USER_AGENT")
                .map(Into::into)
                .unwrap_or(defaults.user_agent),
            default_content: lookup("SCRIBE_PLACEHOLDER_TEXT")
                .map(|text| Node::placeholder(&text))
                .unwrap_or(defaults.default_content),
        })
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            store_url: None,
            store_key: None,
            table: Self::DEFAULT_TABLE.into(),
            max_retries: Self::DEFAULT_MAX_RETRIES,
            retry_base_delay: Self::DEFAULT_RETRY_BASE_DELAY,
            debounce_delay: Self::DEFAULT_DEBOUNCE_DELAY,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
            default_content: Node::placeholder(DEFAULT_PLACEHOLDER_TEXT),
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                message: e.to_string().into(),
            })
        })
        .transpose()
}
