use thiserror::Error;

use crate::{RelationKind, ResourceKey, ResourceKind};

/// The closed set of failures a provider call can surface.
///
/// Callers branch on variants, never on provider-specific error code
/// strings. `AlreadyExists` and `DuplicateLink` are the two recoverable
/// variants: they redirect to a lookup or count as success respectively.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("{kind} already exists for key {key}")]
    AlreadyExists { kind: ResourceKind, key: ResourceKey },

    #[error("duplicate {relation} link on {parent_id}")]
    DuplicateLink {
        parent_id: String,
        relation: RelationKind,
    },

    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: String },

    #[error("provider does not support {operation}")]
    Unsupported { operation: &'static str },

    #[error("provider call failed: {message}")]
    Api { message: String },
}

impl ProviderError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, ProviderError::AlreadyExists { .. })
    }

    pub fn is_duplicate_link(&self) -> bool {
        matches!(self, ProviderError::DuplicateLink { .. })
    }
}
