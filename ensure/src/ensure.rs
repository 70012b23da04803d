use thiserror::Error;
use tracing::{debug, info};

use strato_provider::{
    Provider, ProviderError, ResourceDescriptor, ResourceHandle, ResourceKey, ResourceKind,
};

#[derive(Error, Debug)]
pub enum EnsureError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The provider reported the resource as existing but a follow-up
    /// lookup could not find it.
    #[error("{kind} for key {key} reported existing but cannot be found")]
    InconsistentState { kind: ResourceKind, key: ResourceKey },
}

/// Find-or-create with race tolerance.
///
/// An existing resource is returned unchanged; its attributes are not
/// reconciled against the descriptor. A creation that loses the race to
/// another caller resolves through a second lookup, so two concurrent
/// `ensure` calls for the same key converge on the same resource.
pub async fn ensure<P>(
    provider: &P,
    key: &ResourceKey,
    descriptor: &ResourceDescriptor,
) -> Result<ResourceHandle, EnsureError>
where
    P: Provider + ?Sized,
{
    let kind = descriptor.kind();

    if let Some(existing) = provider.find(kind, key).await? {
        debug!(%kind, %key, id = %existing.id, "reusing existing resource");
        return Ok(existing);
    }

    match provider.create(key, descriptor).await {
        Ok(created) => {
            info!(%kind, %key, id = %created.id, "created resource");
            Ok(created)
        }
        Err(error) if error.is_already_exists() => {
            // Lost a creation race; the winner's resource is ours too.
            debug!(%kind, %key, "creation raced, re-finding");
            match provider.find(kind, key).await? {
                Some(existing) => Ok(existing),
                None => Err(EnsureError::InconsistentState {
                    kind,
                    key: key.clone(),
                }),
            }
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use strato_provider::{LifecycleState, MemoryProvider, SecurityGroupSpec};

    fn group_descriptor() -> ResourceDescriptor {
        ResourceDescriptor::SecurityGroup(SecurityGroupSpec {
            description: "test group".to_owned(),
            vpc_id: "vpc-1".to_owned(),
        })
    }

    fn group_key() -> ResourceKey {
        ResourceKey::scoped("sg-test", "vpc-1")
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let provider = MemoryProvider::new();
        let key = group_key();
        let descriptor = group_descriptor();

        let first = ensure(&provider, &key, &descriptor).await.unwrap();
        let second = ensure(&provider, &key, &descriptor).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(provider.create_count(ResourceKind::SecurityGroup), 1);
    }

    #[tokio::test]
    async fn ensure_on_empty_provider_creates_once() {
        let provider = MemoryProvider::new();
        let handle = ensure(&provider, &group_key(), &group_descriptor())
            .await
            .unwrap();
        assert!(handle.id.starts_with("sg-"));
        assert_eq!(provider.total_create_calls(), 1);
    }

    /// A provider whose `find` misses until a racing caller has created the
    /// resource, and whose `create` always loses that race.
    struct RacingProvider {
        finds: Mutex<u32>,
        creates: Mutex<u32>,
    }

    impl RacingProvider {
        fn new() -> Self {
            Self {
                finds: Mutex::new(0),
                creates: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for RacingProvider {
        async fn find(
            &self,
            kind: ResourceKind,
            _key: &ResourceKey,
        ) -> Result<Option<ResourceHandle>, ProviderError> {
            let mut finds = self.finds.lock().unwrap();
            *finds += 1;
            if *finds == 1 {
                Ok(None)
            } else {
                Ok(Some(ResourceHandle::new(
                    kind,
                    "sg-winner",
                    LifecycleState::Available,
                )))
            }
        }

        async fn create(
            &self,
            key: &ResourceKey,
            descriptor: &ResourceDescriptor,
        ) -> Result<ResourceHandle, ProviderError> {
            *self.creates.lock().unwrap() += 1;
            Err(ProviderError::AlreadyExists {
                kind: descriptor.kind(),
                key: key.clone(),
            })
        }
    }

    #[tokio::test]
    async fn lost_creation_race_resolves_through_refind() {
        let provider = RacingProvider::new();
        let handle = ensure(&provider, &group_key(), &group_descriptor())
            .await
            .unwrap();
        assert_eq!(handle.id, "sg-winner");
        assert_eq!(*provider.creates.lock().unwrap(), 1);
        assert_eq!(*provider.finds.lock().unwrap(), 2);
    }

    /// Claims the resource exists on create but never returns it from find.
    struct LyingProvider;

    #[async_trait]
    impl Provider for LyingProvider {
        async fn find(
            &self,
            _kind: ResourceKind,
            _key: &ResourceKey,
        ) -> Result<Option<ResourceHandle>, ProviderError> {
            Ok(None)
        }

        async fn create(
            &self,
            key: &ResourceKey,
            descriptor: &ResourceDescriptor,
        ) -> Result<ResourceHandle, ProviderError> {
            Err(ProviderError::AlreadyExists {
                kind: descriptor.kind(),
                key: key.clone(),
            })
        }
    }

    #[tokio::test]
    async fn refind_miss_after_race_is_inconsistent_state() {
        let err = ensure(&LyingProvider, &group_key(), &group_descriptor())
            .await
            .unwrap_err();
        assert!(matches!(err, EnsureError::InconsistentState { .. }));
    }

    /// Always finds; create must never be reached.
    struct FindOnlyProvider;

    #[async_trait]
    impl Provider for FindOnlyProvider {
        async fn find(
            &self,
            kind: ResourceKind,
            _key: &ResourceKey,
        ) -> Result<Option<ResourceHandle>, ProviderError> {
            Ok(Some(ResourceHandle::new(
                kind,
                "sg-existing",
                LifecycleState::Available,
            )))
        }

        async fn create(
            &self,
            _key: &ResourceKey,
            _descriptor: &ResourceDescriptor,
        ) -> Result<ResourceHandle, ProviderError> {
            panic!("create must not be called when find hits");
        }
    }

    #[tokio::test]
    async fn find_hit_never_creates() {
        let handle = ensure(&FindOnlyProvider, &group_key(), &group_descriptor())
            .await
            .unwrap();
        assert_eq!(handle.id, "sg-existing");
    }

    /// Transport failures must propagate, never read as "not found".
    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        async fn find(
            &self,
            _kind: ResourceKind,
            _key: &ResourceKey,
        ) -> Result<Option<ResourceHandle>, ProviderError> {
            Err(ProviderError::Api {
                message: "connection reset".to_owned(),
            })
        }

        async fn create(
            &self,
            _key: &ResourceKey,
            _descriptor: &ResourceDescriptor,
        ) -> Result<ResourceHandle, ProviderError> {
            panic!("create must not be called when find fails");
        }
    }

    #[tokio::test]
    async fn find_failure_propagates() {
        let err = ensure(&FailingProvider, &group_key(), &group_descriptor())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EnsureError::Provider(ProviderError::Api { .. })
        ));
    }
}
