use async_trait::async_trait;

use crate::{
    LifecycleState, LinkEnumeration, LinkRelation, ProviderError, RelationKind, ResourceDescriptor,
    ResourceHandle, ResourceKey, ResourceKind,
};

/// Credentials for an image registry, as issued by the provider.
///
/// The token is the provider's own encoding (base64 `user:password`);
/// decoding is the consumer's business.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    pub authorization_token: String,
    pub endpoint: String,
}

/// An object read back from a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    /// Id of the key the provider encrypted the object with, if any.
    pub encrypted_with: Option<String>,
}

/// The seam to a cloud provider's control plane.
///
/// `find` and `create` are the required surface; everything else defaults to
/// `Unsupported` so partial backends and test stubs only implement what they
/// exercise.
///
/// Contract:
/// - `find` returns at most one handle; a transport or auth failure is an
///   error, never "not found".
/// - `create` always mutates remote state on success and reports a
///   key collision as `ProviderError::AlreadyExists`, distinct from every
///   other failure.
/// - `link` re-applied for an edge that already exists either succeeds (for
///   relations the provider treats idempotently) or reports
///   `ProviderError::DuplicateLink`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Look up an existing resource by its stable key. If the provider
    /// reports more than one match, the first is taken.
    async fn find(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
    ) -> Result<Option<ResourceHandle>, ProviderError>;

    /// Create a resource with the given desired attributes.
    async fn create(
        &self,
        key: &ResourceKey,
        descriptor: &ResourceDescriptor,
    ) -> Result<ResourceHandle, ProviderError>;

    /// Current lifecycle state of a resource.
    async fn status(&self, _handle: &ResourceHandle) -> Result<LifecycleState, ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "status",
        })
    }

    /// Enumerate existing edges of one relation kind under a parent, where
    /// the provider exposes such an enumeration.
    async fn links(
        &self,
        _parent: &ResourceHandle,
        _relation: RelationKind,
    ) -> Result<LinkEnumeration, ProviderError> {
        Ok(LinkEnumeration::Unsupported)
    }

    /// Apply a directed edge between two resources.
    async fn link(
        &self,
        _parent: &ResourceHandle,
        _child: &ResourceHandle,
        _relation: &LinkRelation,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported { operation: "link" })
    }

    /// Write one object into a bucket.
    async fn put_object(
        &self,
        _bucket: &ResourceHandle,
        _object_key: &str,
        _body: Vec<u8>,
        _content_type: &str,
    ) -> Result<(), ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "put_object",
        })
    }

    /// Read one object back from a bucket.
    async fn get_object(
        &self,
        _bucket: &ResourceHandle,
        _object_key: &str,
    ) -> Result<StoredObject, ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "get_object",
        })
    }

    /// Issue login credentials for the registry holding a repository.
    async fn registry_auth(
        &self,
        _repository: &ResourceHandle,
    ) -> Result<RegistryAuth, ProviderError> {
        Err(ProviderError::Unsupported {
            operation: "registry_auth",
        })
    }
}
