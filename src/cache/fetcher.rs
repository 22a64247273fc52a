use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, header};
use thiserror::Error;

use super::{AssetRequest, storage::CachedResponse};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Network(err.to_string())
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &AssetRequest) -> Result<CachedResponse, FetchError>;
}

/// Headers that describe a single hop and must not be forwarded or cached.
const HOP_BY_HOP: [header::HeaderName; 6] = [
    header::CONNECTION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::TE,
];

fn end_to_end(headers: &HeaderMap) -> HeaderMap {
    headers
        .iter()
        .filter(|(name, _)| !HOP_BY_HOP.contains(*name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

pub struct HttpFetcher {
    client: reqwest::Client,
    origin: String,
}

impl HttpFetcher {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &AssetRequest) -> Result<CachedResponse, FetchError> {
        let url = format!("{}{}", self.origin, request.path);
        let response = self
            .client
            .request(request.method.clone(), url)
            .headers(end_to_end(&request.headers))
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status();
        let headers = end_to_end(response.headers());
        let body = response.bytes().await?;
        Ok(CachedResponse::new(status, headers, body))
    }
}
