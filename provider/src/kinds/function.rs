use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Serverless function deployed from a pushed container image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub image_uri: String,
    pub role_id: String,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    #[serde(default)]
    pub environment: IndexMap<String, String>,
    #[serde(default)]
    pub tags: IndexMap<String, String>,
}
