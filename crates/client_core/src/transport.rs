//! HTTP access to the records resource.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ListQuery, Record, RecordId},
    error::{ApiError, ApiException},
    protocol::{RecordLookupResponse, RecordsPageResponse},
};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_RECORDS_PATH: &str = "/api/records";

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend rejected request: {0}")]
    Api(#[from] ApiException),
    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("record {0} not found")]
    RecordNotFound(RecordId),
}

/// Fetch and mutation primitives the list controller drives.
#[async_trait]
pub trait RecordsBackend: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<RecordsPageResponse, BackendError>;
    async fn fetch(&self, id: &RecordId) -> Result<Record, BackendError>;
    async fn create(&self, record: &Record) -> Result<(), BackendError>;
    async fn update(&self, id: &RecordId, record: &Record) -> Result<(), BackendError>;
    async fn delete(&self, id: &RecordId) -> Result<(), BackendError>;
}

pub struct HttpRecordsBackend {
    http: Client,
    endpoint: Url,
}

impl HttpRecordsBackend {
    pub fn new(server_url: &str, records_path: &str) -> Result<Self, BackendError> {
        Self::with_client(Client::new(), server_url, records_path)
    }

    pub fn with_client(
        http: Client,
        server_url: &str,
        records_path: &str,
    ) -> Result<Self, BackendError> {
        let endpoint = join_endpoint(server_url, records_path)?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn transport_error(&self, source: reqwest::Error) -> BackendError {
        BackendError::Transport {
            url: self.endpoint.to_string(),
            source,
        }
    }

    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, BackendError> {
        response.json().await.map_err(|source| BackendError::Decode {
            url: self.endpoint.to_string(),
            source,
        })
    }
}

/// Appends `records_path` below the path of `server_url`, so a server
/// mounted under a prefix (`http://host/app`) keeps that prefix.
fn join_endpoint(server_url: &str, records_path: &str) -> Result<Url, url::ParseError> {
    let mut base = Url::parse(server_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(records_path.trim_start_matches('/'))
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(err) => {
            warn!(%status, error = %err, "records: failed to read error body");
            String::new()
        }
    };
    Err(ApiException::from(ApiError::from_response(status.as_u16(), &body)).into())
}

#[async_trait]
impl RecordsBackend for HttpRecordsBackend {
    async fn list(&self, query: &ListQuery) -> Result<RecordsPageResponse, BackendError> {
        let params = query.to_params();
        debug!(endpoint = %self.endpoint, ?params, "records: list");
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&params)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = ensure_success(response).await?;
        self.decode(response).await
    }

    async fn fetch(&self, id: &RecordId) -> Result<Record, BackendError> {
        debug!(endpoint = %self.endpoint, record_id = %id, "records: fetch");
        let response = self
            .http
            .get(self.endpoint.clone())
            .query(&[("id", id.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = ensure_success(response).await?;
        let lookup: RecordLookupResponse = self.decode(response).await?;
        lookup
            .into_first()
            .ok_or_else(|| BackendError::RecordNotFound(id.clone()))
    }

    async fn create(&self, record: &Record) -> Result<(), BackendError> {
        debug!(endpoint = %self.endpoint, "records: create");
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn update(&self, id: &RecordId, record: &Record) -> Result<(), BackendError> {
        debug!(endpoint = %self.endpoint, record_id = %id, "records: update");
        let response = self
            .http
            .put(self.endpoint.clone())
            .query(&[("id", id.as_str())])
            .json(record)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> Result<(), BackendError> {
        debug!(endpoint = %self.endpoint, record_id = %id, "records: delete");
        let response = self
            .http
            .delete(self.endpoint.clone())
            .query(&[("id", id.as_str())])
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        ensure_success(response).await?;
        Ok(())
    }
}
