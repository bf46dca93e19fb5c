#![doc = "HTTP client for the storage/database service: bridges the core `RemoteStore` contract to a REST backend."]
//
//! # Store client
//!
//! [`RestStore`] talks to a Supabase-style service:
//!
//! - blobs: `POST {url}/storage/v1/object/{bucket}/{path}`, public at
//!   `{url}/storage/v1/object/public/{bucket}/{path}`
//! - rows: `POST {url}/rest/v1/{table}` with `Prefer: return=representation`
//!
//! The key is sent both as `apikey` and as a bearer token. Construct it from
//! [`StoreSettings`](crate::load_config::StoreSettings), which the loader fills
//! from `PUBLISH_STORE_URL` and `PUBLISH_STORE_KEY`.

use async_trait::async_trait;
use daily_publish_core::contract::{AudioRecord, DailyRecord, RemoteStore, TextRecord};
use daily_publish_core::error::StoreError;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};

use crate::load_config::StoreSettings;

pub const DAILY_TABLE: &str = "dailies";
pub const AUDIO_TABLE: &str = "audio_files";
pub const TEXT_TABLE: &str = "texts";

pub struct RestStore {
    client: Client,
    base_url: String,
    key: String,
    bucket: String,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: i64,
}

impl RestStore {
    pub fn new(settings: &StoreSettings) -> Self {
        tracing::info!(
            url = %settings.url,
            bucket = %settings.bucket,
            key_set = !settings.key.is_empty(),
            "Initialized RestStore"
        );
        Self {
            client: Client::new(),
            base_url: settings.url.trim_end_matches('/').to_string(),
            key: settings.key.clone(),
            bucket: settings.bucket.clone(),
        }
    }

    pub fn object_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.key)
            .bearer_auth(&self.key)
    }

    async fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = self.authorized(request).send().await.map_err(|e| {
            tracing::error!(error = ?e, url, "Store request failed");
            StoreError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
        tracing::error!(status = %status, url, body = %body, "Store returned error status");
        Err(StoreError::Status {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    /// Insert one row into `table` and return the rows the service echoes back.
    async fn insert<T: Serialize + ?Sized>(
        &self,
        table: &str,
        row: &T,
    ) -> Result<Vec<InsertedRow>, StoreError> {
        let url = self.table_url(table);
        tracing::debug!(url = %url, body = ?serde_json::to_string(row).ok(), "Inserting row");
        let response = self
            .send(
                &url,
                self.client
                    .post(&url)
                    .header("Prefer", "return=representation")
                    .json(row),
            )
            .await?;
        response.json().await.map_err(|e| {
            tracing::error!(error = ?e, url = %url, "Failed to decode insert response");
            StoreError::Decode {
                url: url.clone(),
                message: e.to_string(),
            }
        })
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn upload_blob(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<String, StoreError> {
        let url = self.object_url(path);
        tracing::info!(url = %url, size = bytes.len(), content_type, "Uploading blob");
        self.send(
            &url,
            self.client
                .post(&url)
                .header("Content-Type", content_type)
                .header("x-upsert", "true")
                .body(bytes.to_vec()),
        )
        .await?;
        let public = self.public_url(path);
        tracing::info!(url = %public, "Uploaded blob");
        Ok(public)
    }

    async fn insert_daily(&self, record: &DailyRecord) -> Result<i64, StoreError> {
        let rows = self.insert(DAILY_TABLE, record).await?;
        match rows.first() {
            Some(row) => {
                tracing::info!(daily_id = row.id, name = %record.name, "Inserted daily record");
                Ok(row.id)
            }
            None => Err(StoreError::Decode {
                url: self.table_url(DAILY_TABLE),
                message: "insert returned no rows".to_string(),
            }),
        }
    }

    async fn insert_audio(&self, record: &AudioRecord) -> Result<(), StoreError> {
        self.insert(AUDIO_TABLE, record).await?;
        tracing::info!(file = %record.file_name, daily_id = record.daily_id, "Inserted audio record");
        Ok(())
    }

    async fn insert_text(&self, record: &TextRecord) -> Result<(), StoreError> {
        self.insert(TEXT_TABLE, record).await?;
        tracing::info!(daily_id = record.daily_id, length = record.length, "Inserted text record");
        Ok(())
    }

    async fn download_blob(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        let url = self.object_url(path);
        let response = self.send(&url, self.client.get(&url)).await?;
        let bytes = response.bytes().await.map_err(|e| StoreError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        tracing::info!(url = %url, size = bytes.len(), "Downloaded blob");
        Ok(bytes.to_vec())
    }
}
