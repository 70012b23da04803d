use serde::{Deserialize, Serialize};

/// Symmetric encrypt/decrypt key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KmsKeySpec {
    pub description: String,
}

/// Object storage bucket. Default encryption with a key is attached as a
/// link after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub region: Option<String>,
}
