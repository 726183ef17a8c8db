//! `StoreBackend` over a PostgREST API (Supabase and friends).

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Serialize;
use smol_str::{SmolStr, format_smolstr};
use url::Url;

use crate::SyncConfig;
use crate::error::{BackendError, ConfigError};
use crate::store::{DocumentRow, StoreBackend};

/// Ask PostgREST for exactly one object; it answers 406 when there is none.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[derive(Debug, Clone)]
pub struct PostgrestBackend {
    client: reqwest::Client,
    base_url: Url,
    api_key: SmolStr,
    table: SmolStr,
}

#[derive(Serialize)]
struct ContentUpdate<'a> {
    content: &'a str,
    updated_at: DateTime<Utc>,
}

impl PostgrestBackend {
    pub fn new(base_url: Url, api_key: impl Into<SmolStr>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key: api_key.into(),
            table: SyncConfig::DEFAULT_TABLE.into(),
        }
    }

    pub fn with_table(mut self, table: impl Into<SmolStr>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Build from `SCRIBE_STORE_URL` / `SCRIBE_STORE_KEY` settings.
    pub fn from_config(config: &SyncConfig) -> Result<Self, ConfigError> {
        let base_url = config.store_url.clone().ok_or(ConfigError::MissingEnv {
            var: "SCRIBE_STORE_URL",
        })?;
        let api_key = config.store_key.clone().ok_or(ConfigError::MissingEnv {
            var: "SCRIBE_STORE_KEY",
        })?;
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                var: "SCRIBE_USER_AGENT",
                message: e.to_string().into(),
            })?;

        Ok(Self::new(base_url, api_key)
            .with_table(config.table.clone())
            .with_client(client))
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// `{base}/rest/v1/{table}?id=eq.{doc_id}`
    pub fn row_url(&self, doc_id: &str) -> Result<Url, BackendError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::Url(format_smolstr!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(["rest", "v1", self.table.as_str()]);
        url.query_pairs_mut()
            .append_pair("id", &format!("eq.{doc_id}"));
        Ok(url)
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_str())
            .bearer_auth(&self.api_key)
    }
}

impl StoreBackend for PostgrestBackend {
    async fn fetch_document(&self, doc_id: &str) -> Result<Option<DocumentRow>, BackendError> {
        let mut url = self.row_url(doc_id)?;
        url.query_pairs_mut().append_pair("select", "id,title,content");

        let response = self
            .request(reqwest::Method::GET, url)
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_ACCEPTABLE {
            tracing::debug!(doc_id, "no document row");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(response).await);
        }

        Ok(Some(response.json::<DocumentRow>().await?))
    }

    async fn update_document(
        &self,
        doc_id: &str,
        content: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), BackendError> {
        let url = self.row_url(doc_id)?;
        let response = self
            .request(reqwest::Method::PATCH, url)
            .header("Prefer", "return=minimal")
            .json(&ContentUpdate {
                content,
                updated_at,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }
        Ok(())
    }
}

async fn status_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Status {
        status,
        body: body.into(),
    }
}
