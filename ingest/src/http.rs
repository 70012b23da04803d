use reqwest::Client;
use thiserror::Error;
use url::Url;

const REQUEST_TIMEOUT_SEC: u64 = 10;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {0}")]
    BuildClient(#[source] reqwest::Error),

    #[error("HTTP request error: {0}")]
    Request(#[source] reqwest::Error),

    #[error("HTTP status error: {0}")]
    Status(#[source] reqwest::Error),

    #[error("HTTP body error: {0}")]
    Body(#[source] reqwest::Error),
}

/// A successful JSON fetch: the status the source answered with and its
/// decoded body.
#[derive(Debug, Clone)]
pub struct FetchedJson {
    pub status_code: u16,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, HttpError> {
        let client = Client::builder()
            .read_timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SEC))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(HttpError::BuildClient)?;
        Ok(HttpClient { client })
    }

    /// GET a URL expected to answer with JSON; non-success statuses are
    /// errors.
    pub async fn get_json(&self, url: &Url) -> Result<FetchedJson, HttpError> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(HttpError::Request)?
            .error_for_status()
            .map_err(HttpError::Status)?;
        let status_code = resp.status().as_u16();
        let data = resp.json().await.map_err(HttpError::Body)?;
        Ok(FetchedJson { status_code, data })
    }
}
