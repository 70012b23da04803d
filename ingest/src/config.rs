use std::env;

use thiserror::Error;
use url::Url;

pub const URL_ENV: &str = "URL_TO_FETCH";
pub const BUCKET_ENV: &str = "BUCKET_NAME";

#[derive(Error, Debug)]
pub enum IngestConfigError {
    #[error("missing environment variable: {name}")]
    Missing { name: &'static str },

    #[error("invalid URL in {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

/// Runtime configuration for the ingest handler, supplied through the
/// function's environment.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub source_url: Url,
    pub bucket: String,
}

impl IngestConfig {
    pub fn new(source_url: Url, bucket: impl Into<String>) -> Self {
        Self {
            source_url,
            bucket: bucket.into(),
        }
    }

    pub fn from_env() -> Result<Self, IngestConfigError> {
        let url = env::var(URL_ENV).map_err(|_| IngestConfigError::Missing { name: URL_ENV })?;
        let source_url = Url::parse(&url).map_err(|source| IngestConfigError::InvalidUrl {
            name: URL_ENV,
            source,
        })?;
        let bucket =
            env::var(BUCKET_ENV).map_err(|_| IngestConfigError::Missing { name: BUCKET_ENV })?;
        Ok(Self { source_url, bucket })
    }
}
