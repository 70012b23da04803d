mod config;
mod http;

pub use config::{BUCKET_ENV, IngestConfig, IngestConfigError, URL_ENV};
pub use http::{FetchedJson, HttpClient, HttpError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use strato_provider::{Provider, ProviderError, ResourceHandle, ResourceKind};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] IngestConfigError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to encode log record: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Per-invocation context, normally handed in by the function runtime.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One log object, written per invocation.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub status_code: u16,
    pub data: serde_json::Value,
}

/// Where the handler put this invocation's log object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReceipt {
    pub bucket: String,
    pub object_key: String,
}

fn object_key(timestamp: &DateTime<Utc>, request_id: &str) -> String {
    format!(
        "log_{}_{request_id}.json",
        timestamp.format("%Y%m%d_%H%M%S")
    )
}

/// Fetch the configured source URL and store one JSON log object in the
/// configured bucket. No retry beyond the runtime's own invocation policy.
pub async fn handle<P>(
    provider: &P,
    http: &HttpClient,
    config: &IngestConfig,
    context: &RequestContext,
) -> Result<IngestReceipt, IngestError>
where
    P: Provider + ?Sized,
{
    let fetched = http.get_json(&config.source_url).await?;

    let timestamp = Utc::now();
    let record = LogRecord {
        timestamp,
        url: config.source_url.to_string(),
        status_code: fetched.status_code,
        data: fetched.data,
    };
    let body = serde_json::to_vec_pretty(&record).map_err(IngestError::Encode)?;

    let bucket = ResourceHandle::external(ResourceKind::Bucket, &config.bucket);
    let object_key = object_key(&timestamp, &context.request_id);
    provider
        .put_object(&bucket, &object_key, body, "application/json")
        .await?;

    info!(bucket = %config.bucket, object = %object_key, "stored log object");
    Ok(IngestReceipt {
        bucket: config.bucket.clone(),
        object_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use strato_provider::MemoryProvider;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn object_key_is_timestamped_and_unique_per_request() {
        let timestamp = Utc.with_ymd_and_hms(2024, 7, 1, 12, 30, 45).unwrap();
        assert_eq!(
            object_key(&timestamp, "req-1"),
            "log_20240701_123045_req-1.json"
        );
    }

    #[tokio::test]
    async fn handler_writes_one_object_per_invocation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [1, 2, 3]
            })))
            .mount(&server)
            .await;

        let provider = MemoryProvider::new();
        let http = HttpClient::new().unwrap();
        let url = Url::parse(&format!("{}/data", server.uri())).unwrap();
        let config = IngestConfig::new(url.clone(), "log-bucket");

        let receipt = handle(&provider, &http, &config, &RequestContext::new())
            .await
            .unwrap();
        assert_eq!(receipt.bucket, "log-bucket");
        assert_eq!(provider.object_count("log-bucket"), 1);

        let bucket = ResourceHandle::external(ResourceKind::Bucket, "log-bucket");
        let stored = provider
            .get_object(&bucket, &receipt.object_key)
            .await
            .unwrap();
        let record: serde_json::Value = serde_json::from_slice(&stored.body).unwrap();
        assert_eq!(record["url"], url.to_string());
        assert_eq!(record["status_code"], 200);
        assert_eq!(record["data"]["items"][2], 3);
    }

    #[tokio::test]
    async fn source_error_status_is_fatal_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let provider = MemoryProvider::new();
        let http = HttpClient::new().unwrap();
        let config = IngestConfig::new(Url::parse(&server.uri()).unwrap(), "log-bucket");

        let err = handle(&provider, &http, &config, &RequestContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Http(HttpError::Status(_))));
        assert_eq!(provider.object_count("log-bucket"), 0);
    }
}
