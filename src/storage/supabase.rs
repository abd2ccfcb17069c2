//! Supabase storage over the PostgREST HTTP API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;

use crate::config::SupabaseConfig;
use crate::models::{NewVisit, Visit};
use crate::storage::{StorageError, StorageResult, VisitStorage};

const VISITS_TABLE: &str = "visits";

/// Postgres SQLSTATE for `invalid_text_representation`, forwarded by PostgREST.
const INVALID_TEXT_REPRESENTATION: &str = "22P02";

#[derive(Clone)]
pub struct SupabaseStorage {
    table_url: String,
    api_key: String,
    client: Client,
}

/// Error body returned by PostgREST
#[derive(Debug, Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

impl SupabaseStorage {
    pub fn new(config: &SupabaseConfig, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("visitlog/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client for Supabase")?;

        let table_url = format!(
            "{}/rest/v1/{}",
            config.url.trim_end_matches('/'),
            VISITS_TABLE
        );

        Ok(Self {
            table_url,
            api_key: config.key.clone(),
            client,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn check(response: Response) -> StorageResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

/// Map a non-success PostgREST response onto the storage error taxonomy.
fn classify_error(status: u16, body: &str) -> StorageError {
    match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => {
            let message = match (err.message, err.details) {
                (Some(message), Some(details)) => format!("{message} ({details})"),
                (Some(message), None) => message,
                (None, Some(details)) => details,
                (None, None) => body.to_string(),
            };

            if err.code.as_deref() == Some(INVALID_TEXT_REPRESENTATION) {
                StorageError::InvalidAddress(message)
            } else {
                StorageError::Rejected { status, message }
            }
        }
        Err(_) => StorageError::Rejected {
            status,
            message: body.trim().to_string(),
        },
    }
}

#[async_trait]
impl VisitStorage for SupabaseStorage {
    async fn init(&self) -> Result<()> {
        // PostgREST cannot run DDL, so only probe that the table answers.
        let url = format!("{}?select=id&limit=1", self.table_url);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .context("failed to reach Supabase")?;

        Self::check(response)
            .await
            .context("Supabase rejected the visits table probe")?;

        Ok(())
    }

    async fn insert(&self, visit: &NewVisit) -> StorageResult<()> {
        let response = self
            .authorized(self.client.post(&self.table_url))
            .header("Prefer", "return=minimal")
            .json(visit)
            .send()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        Self::check(response).await?;
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> StorageResult<Vec<Visit>> {
        let url = format!(
            "{}?select=*&order=ts.desc,id.desc&limit={}",
            self.table_url, limit
        );

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| StorageError::Other(e.into()))?;

        let response = Self::check(response).await?;
        response
            .json::<Vec<Visit>>()
            .await
            .map_err(|e| StorageError::Decode(e.to_string()))
    }
}
