use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;
use url::Url;

use crate::config::HarvestConfig;
use crate::domain::RecordDocument;
use crate::error::HarvestError;

/// Retrieves one JSON document. Implementations issue exactly one request
/// per call and never retry.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<RecordDocument, HarvestError>;
}

/// Fetcher backed by one connection-pooled `reqwest::Client` shared by every
/// concurrent unit of work. `file://` URLs are read from disk.
#[derive(Clone)]
pub struct HttpRecordFetcher {
    client: Client,
}

impl HttpRecordFetcher {
    pub fn new(config: &HarvestConfig) -> Result<Self, HarvestError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|err| HarvestError::InvalidConfig(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|err| HarvestError::InvalidConfig(err.to_string()))?;
        Ok(Self { client })
    }

    async fn fetch_http(&self, url: &Url) -> Result<RecordDocument, HarvestError> {
        let transport = |err: reqwest::Error| HarvestError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        };

        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(HarvestError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().await.map_err(transport)?;
        debug!(url = %url, bytes = body.len(), "fetched document");
        decode(url, &body)
    }

    async fn fetch_file(&self, url: &Url) -> Result<RecordDocument, HarvestError> {
        let path = url
            .to_file_path()
            .map_err(|_| HarvestError::InvalidUri(url.to_string()))?;
        let body = tokio::fs::read(&path)
            .await
            .map_err(|err| HarvestError::io(path.display(), err))?;
        decode(url, &body)
    }
}

#[async_trait]
impl RecordFetcher for HttpRecordFetcher {
    async fn fetch(&self, url: &Url) -> Result<RecordDocument, HarvestError> {
        match url.scheme() {
            "http" | "https" => self.fetch_http(url).await,
            "file" => self.fetch_file(url).await,
            _ => Err(HarvestError::InvalidUri(url.to_string())),
        }
    }
}

fn decode(url: &Url, body: &[u8]) -> Result<RecordDocument, HarvestError> {
    serde_json::from_slice(body).map_err(|err| HarvestError::Decode {
        source_name: url.to_string(),
        message: err.to_string(),
    })
}
