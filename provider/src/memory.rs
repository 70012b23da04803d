use std::sync::Mutex;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use indexmap::IndexMap;
use tracing::debug;
use uuid::Uuid;

use crate::{
    LifecycleState, Link, LinkEnumeration, LinkRelation, Provider, ProviderError, RegistryAuth,
    RelationKind, ResourceDescriptor, ResourceHandle, ResourceKey, ResourceKind, StoredObject,
};

const REGISTRY_ENDPOINT: &str = "registry.memory.test";

/// In-memory provider backend.
///
/// Serves two purposes: the deterministic backend for tests, and the demo
/// backend for the CLI flows. Asynchronous settling is simulated per kind:
/// a freshly created gateway or function stays pending for a configured
/// number of status polls before reporting available.
pub struct MemoryProvider {
    inner: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    resources: IndexMap<(ResourceKind, ResourceKey), MemoryResource>,
    links: Vec<Link>,
    objects: IndexMap<(String, String), StoredObject>,
    settle_polls: IndexMap<ResourceKind, u32>,
    create_calls: IndexMap<ResourceKind, usize>,
    link_calls: usize,
}

struct MemoryResource {
    id: String,
    state: LifecycleState,
    polls_remaining: u32,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        let mut settle_polls = IndexMap::new();
        settle_polls.insert(ResourceKind::NatGateway, 2);
        settle_polls.insert(ResourceKind::Function, 2);
        Self {
            inner: Mutex::new(MemoryState {
                settle_polls,
                ..MemoryState::default()
            }),
        }
    }

    /// Number of status polls a freshly created resource of this kind stays
    /// pending for. Zero means available immediately.
    pub fn settle_after(&self, kind: ResourceKind, polls: u32) {
        let mut state = self.inner.lock().unwrap();
        state.settle_polls.insert(kind, polls);
    }

    /// Keep resources of this kind pending forever.
    pub fn hold_pending(&self, kind: ResourceKind) {
        self.settle_after(kind, u32::MAX);
    }

    /// Force an existing resource into the failed state.
    pub fn fail(&self, id: &str) {
        let mut state = self.inner.lock().unwrap();
        if let Some(resource) = state.resources.values_mut().find(|r| r.id == id) {
            resource.state = LifecycleState::Failed;
            resource.polls_remaining = 0;
        }
    }

    pub fn create_count(&self, kind: ResourceKind) -> usize {
        let state = self.inner.lock().unwrap();
        state.create_calls.get(&kind).copied().unwrap_or(0)
    }

    pub fn total_create_calls(&self) -> usize {
        let state = self.inner.lock().unwrap();
        state.create_calls.values().sum()
    }

    pub fn link_call_count(&self) -> usize {
        self.inner.lock().unwrap().link_calls
    }

    pub fn link_count(&self, parent_id: &str, relation: RelationKind) -> usize {
        let state = self.inner.lock().unwrap();
        state
            .links
            .iter()
            .filter(|l| l.parent_id == parent_id && l.relation.kind() == relation)
            .count()
    }

    pub fn object_count(&self, bucket_id: &str) -> usize {
        let state = self.inner.lock().unwrap();
        state
            .objects
            .keys()
            .filter(|(bucket, _)| bucket == bucket_id)
            .count()
    }

    fn mint_id(kind: ResourceKind, key: &ResourceKey) -> String {
        let suffix = &Uuid::new_v4().simple().to_string()[..12];
        match kind {
            // Buckets are addressed by name; repository ids are pull URIs.
            ResourceKind::Bucket => key.name.clone(),
            ResourceKind::Repository => format!("{REGISTRY_ENDPOINT}/{}", key.name),
            ResourceKind::SecurityGroup => format!("sg-{suffix}"),
            ResourceKind::Role => format!("role/{}", key.name),
            ResourceKind::InstanceProfile => format!("profile/{}", key.name),
            ResourceKind::ElasticIp => format!("eipalloc-{suffix}"),
            ResourceKind::NatGateway => format!("nat-{suffix}"),
            ResourceKind::Instance => format!("i-{suffix}"),
            ResourceKind::Function => format!("fn-{suffix}"),
            ResourceKind::KmsKey => format!("key-{suffix}"),
            _ => format!("{}-{suffix}", kind.as_str()),
        }
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn find(
        &self,
        kind: ResourceKind,
        key: &ResourceKey,
    ) -> Result<Option<ResourceHandle>, ProviderError> {
        let state = self.inner.lock().unwrap();
        let found = state
            .resources
            .get(&(kind, key.clone()))
            .map(|resource| ResourceHandle::new(kind, resource.id.clone(), resource.state));
        Ok(found)
    }

    async fn create(
        &self,
        key: &ResourceKey,
        descriptor: &ResourceDescriptor,
    ) -> Result<ResourceHandle, ProviderError> {
        let kind = descriptor.kind();
        let mut state = self.inner.lock().unwrap();
        *state.create_calls.entry(kind).or_insert(0) += 1;

        if state.resources.contains_key(&(kind, key.clone())) {
            return Err(ProviderError::AlreadyExists {
                kind,
                key: key.clone(),
            });
        }

        let id = Self::mint_id(kind, key);
        let polls_remaining = state.settle_polls.get(&kind).copied().unwrap_or(0);
        let lifecycle = if polls_remaining == 0 {
            LifecycleState::Available
        } else {
            LifecycleState::Pending
        };
        debug!(%kind, %key, %id, "created resource");
        state.resources.insert(
            (kind, key.clone()),
            MemoryResource {
                id: id.clone(),
                state: lifecycle,
                polls_remaining,
            },
        );
        Ok(ResourceHandle::new(kind, id, lifecycle))
    }

    async fn status(&self, handle: &ResourceHandle) -> Result<LifecycleState, ProviderError> {
        let mut state = self.inner.lock().unwrap();
        let resource = state
            .resources
            .values_mut()
            .find(|r| r.id == handle.id)
            .ok_or_else(|| ProviderError::NotFound {
                kind: handle.kind,
                id: handle.id.clone(),
            })?;
        if resource.state == LifecycleState::Pending {
            resource.polls_remaining = resource.polls_remaining.saturating_sub(1);
            if resource.polls_remaining == 0 {
                resource.state = LifecycleState::Available;
            }
        }
        Ok(resource.state)
    }

    async fn links(
        &self,
        parent: &ResourceHandle,
        relation: RelationKind,
    ) -> Result<LinkEnumeration, ProviderError> {
        // Policy attachment is idempotent provider-side and offers no cheap
        // enumeration; callers attempt and tolerate the duplicate.
        if relation == RelationKind::AttachPolicy {
            return Ok(LinkEnumeration::Unsupported);
        }
        let state = self.inner.lock().unwrap();
        let links = state
            .links
            .iter()
            .filter(|l| l.parent_id == parent.id && l.relation.kind() == relation)
            .cloned()
            .collect();
        Ok(LinkEnumeration::Links(links))
    }

    async fn link(
        &self,
        parent: &ResourceHandle,
        child: &ResourceHandle,
        relation: &LinkRelation,
    ) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();
        state.link_calls += 1;

        let duplicate = state.links.iter().any(|l| {
            l.parent_id == parent.id && l.child_id == child.id && l.relation == *relation
        });
        if duplicate {
            // Policy attachment succeeds on re-apply; everything else
            // surfaces the duplicate for the caller to interpret.
            if relation.kind() == RelationKind::AttachPolicy {
                return Ok(());
            }
            return Err(ProviderError::DuplicateLink {
                parent_id: parent.id.clone(),
                relation: relation.kind(),
            });
        }

        debug!(parent = %parent.id, child = %child.id, relation = %relation.kind(), "applied link");
        state.links.push(Link {
            parent_id: parent.id.clone(),
            child_id: child.id.clone(),
            relation: relation.clone(),
        });
        Ok(())
    }

    async fn put_object(
        &self,
        bucket: &ResourceHandle,
        object_key: &str,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<(), ProviderError> {
        let mut state = self.inner.lock().unwrap();
        let encrypted_with = state
            .links
            .iter()
            .find(|l| {
                l.parent_id == bucket.id && l.relation.kind() == RelationKind::BucketEncryption
            })
            .map(|l| l.child_id.clone());
        state.objects.insert(
            (bucket.id.clone(), object_key.to_owned()),
            StoredObject {
                body,
                content_type: content_type.to_owned(),
                encrypted_with,
            },
        );
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &ResourceHandle,
        object_key: &str,
    ) -> Result<StoredObject, ProviderError> {
        let state = self.inner.lock().unwrap();
        state
            .objects
            .get(&(bucket.id.clone(), object_key.to_owned()))
            .cloned()
            .ok_or_else(|| ProviderError::NotFound {
                kind: ResourceKind::Bucket,
                id: format!("{}/{object_key}", bucket.id),
            })
    }

    async fn registry_auth(
        &self,
        _repository: &ResourceHandle,
    ) -> Result<RegistryAuth, ProviderError> {
        let password = Uuid::new_v4().simple().to_string();
        let token = Base64::encode_string(format!("AWS:{password}").as_bytes());
        Ok(RegistryAuth {
            authorization_token: token,
            endpoint: REGISTRY_ENDPOINT.to_owned(),
        })
    }
}
