//! Record backend for the hosted table API.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::{Fields, RecordBackend, ID_FIELD};

pub const PROJECT_ID_HEADER: &str = "X-Project-Id";
pub const PUBLIC_KEY_HEADER: &str = "X-Public-Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSettings {
    pub base_url: String,
    pub project_id: String,
    pub public_key: String,
}

#[derive(Clone)]
pub struct HttpRecordBackend {
    http: Client,
    base_url: Url,
    project_id: String,
    public_key: String,
}

#[derive(Serialize)]
struct RecordsRequest {
    records: Vec<Fields>,
}

#[derive(Serialize)]
struct DeleteRequest {
    #[serde(rename = "RecordIds")]
    record_ids: Vec<i64>,
}

#[derive(Deserialize)]
struct FetchResponse<T> {
    success: bool,
    #[serde(default)]
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct BulkResponse {
    success: bool,
    #[serde(default)]
    results: Vec<RecordResult>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct RecordResult {
    success: bool,
    #[serde(default)]
    data: Option<Fields>,
    #[serde(default)]
    message: Option<String>,
}

impl HttpRecordBackend {
    pub fn new(settings: RemoteSettings) -> Result<Self> {
        Self::with_client(Client::new(), settings)
    }

    pub fn with_client(http: Client, settings: RemoteSettings) -> Result<Self> {
        let base_url = Url::parse(&settings.base_url)
            .with_context(|| format!("invalid remote base url '{}'", settings.base_url))?;
        if settings.project_id.trim().is_empty() {
            bail!("remote backend requires a project id");
        }
        Ok(Self {
            http,
            base_url,
            project_id: settings.project_id,
            public_key: settings.public_key,
        })
    }

    fn records_url(&self, collection: &str) -> String {
        format!(
            "{}/tables/{collection}/records",
            self.base_url.as_str().trim_end_matches('/')
        )
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(PROJECT_ID_HEADER, &self.project_id)
            .header(PUBLIC_KEY_HEADER, &self.public_key)
    }

    async fn send_bulk(
        &self,
        method: Method,
        collection: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<BulkResponse> {
        let response = self
            .request(method.clone(), self.records_url(collection))
            .json(body)
            .send()
            .await
            .with_context(|| format!("{method} '{collection}' records request failed"))?
            .error_for_status()?;
        let bulk: BulkResponse = response.json().await?;
        if !bulk.success {
            bail!(
                "{method} '{collection}' records rejected: {}",
                bulk.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(bulk)
    }

    /// A failed update or delete on a record that no longer exists is a miss,
    /// matching the local store. Any other failure keeps the backend message.
    async fn settle_failure(&self, collection: &str, id: i64, message: String) -> Result<()> {
        if self.fetch_one(collection, id).await?.is_none() {
            info!(collection, id, %message, "remote record missing");
            return Ok(());
        }
        warn!(collection, id, %message, "remote record operation failed");
        bail!("'{collection}' record {id} rejected: {message}");
    }
}

/// First per-record result of a bulk call; a failed entry is handed back
/// as `Err` with the backend's message for the caller to classify.
fn single_result(bulk: BulkResponse) -> Option<Result<RecordResult, String>> {
    let result = bulk.results.into_iter().next()?;
    if result.success {
        return Some(Ok(result));
    }
    Some(Err(result
        .message
        .unwrap_or_else(|| "no message".to_string())))
}

#[async_trait]
impl RecordBackend for HttpRecordBackend {
    async fn fetch_all(&self, collection: &str) -> Result<Vec<Fields>> {
        let response = self
            .request(Method::GET, self.records_url(collection))
            .send()
            .await
            .with_context(|| format!("failed to fetch '{collection}' records"))?
            .error_for_status()?;
        let body: FetchResponse<Vec<Fields>> = response.json().await?;
        if !body.success {
            bail!(
                "fetching '{collection}' records failed: {}",
                body.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(body.data.unwrap_or_default())
    }

    async fn fetch_one(&self, collection: &str, id: i64) -> Result<Option<Fields>> {
        let url = format!("{}/{id}", self.records_url(collection));
        let response = self
            .request(Method::GET, url)
            .send()
            .await
            .with_context(|| format!("failed to fetch '{collection}' record {id}"))?;
        if response.status() == StatusCode::NOT_FOUND {
            info!(collection, id, "remote record not found");
            return Ok(None);
        }
        let body: FetchResponse<Fields> = response.error_for_status()?.json().await?;
        if !body.success {
            bail!(
                "fetching '{collection}' record {id} failed: {}",
                body.message.as_deref().unwrap_or("no message")
            );
        }
        Ok(body.data)
    }

    async fn create(&self, collection: &str, mut fields: Fields) -> Result<Option<Fields>> {
        fields.remove(ID_FIELD);
        let body = RecordsRequest {
            records: vec![fields],
        };
        let bulk = self.send_bulk(Method::POST, collection, &body).await?;
        match single_result(bulk) {
            Some(Ok(result)) => Ok(result.data),
            Some(Err(message)) => {
                warn!(collection, %message, "remote record create failed");
                bail!("'{collection}' record rejected: {message}");
            }
            None => Ok(None),
        }
    }

    async fn update(&self, collection: &str, id: i64, mut fields: Fields) -> Result<Option<Fields>> {
        fields.insert(ID_FIELD.to_string(), Value::from(id));
        let body = RecordsRequest {
            records: vec![fields],
        };
        let bulk = self.send_bulk(Method::PATCH, collection, &body).await?;
        match single_result(bulk) {
            Some(Ok(result)) => Ok(result.data),
            Some(Err(message)) => {
                self.settle_failure(collection, id, message).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, collection: &str, id: i64) -> Result<bool> {
        let body = DeleteRequest {
            record_ids: vec![id],
        };
        let bulk = self.send_bulk(Method::DELETE, collection, &body).await?;
        match single_result(bulk) {
            Some(Ok(_)) => Ok(true),
            Some(Err(message)) => {
                self.settle_failure(collection, id, message).await?;
                Ok(false)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
#[path = "tests/remote_tests.rs"]
mod tests;
