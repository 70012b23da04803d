use tracing::{debug, info};

use strato_provider::{LinkEnumeration, LinkRelation, Provider, ResourceHandle};

use crate::EnsureError;

/// Apply a directed attachment between two resources, at most once.
///
/// Where the provider enumerates existing edges of this relation the edge is
/// pre-checked and skipped if present; otherwise it is applied and a
/// duplicate error counts as success.
pub async fn ensure_link<P>(
    provider: &P,
    parent: &ResourceHandle,
    child: &ResourceHandle,
    relation: &LinkRelation,
) -> Result<(), EnsureError>
where
    P: Provider + ?Sized,
{
    match provider.links(parent, relation.kind()).await? {
        LinkEnumeration::Links(links) => {
            let present = links
                .iter()
                .any(|link| link.child_id == child.id && link.relation == *relation);
            if present {
                debug!(parent = %parent.id, child = %child.id, relation = %relation.kind(),
                    "link already present");
                return Ok(());
            }
        }
        LinkEnumeration::Unsupported => {
            debug!(relation = %relation.kind(), "no link enumeration, applying directly");
        }
    }

    match provider.link(parent, child, relation).await {
        Ok(()) => {
            info!(parent = %parent.id, child = %child.id, relation = %relation.kind(),
                "applied link");
            Ok(())
        }
        Err(error) if error.is_duplicate_link() => {
            debug!(parent = %parent.id, child = %child.id, relation = %relation.kind(),
                "link raced, already applied");
            Ok(())
        }
        Err(error) => Err(error.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use strato_provider::{
        BucketSpec, MemoryProvider, RelationKind, ResourceDescriptor, ResourceKey, ResourceKind,
        RuleSpec,
    };

    #[tokio::test]
    async fn attach_policy_twice_produces_one_attachment() {
        let provider = MemoryProvider::new();
        let role = ResourceHandle::external(ResourceKind::Role, "role/app");
        let policy = ResourceHandle::external(ResourceKind::ManagedPolicy, "arn:policy/core");

        ensure_link(&provider, &role, &policy, &LinkRelation::AttachPolicy)
            .await
            .unwrap();
        ensure_link(&provider, &role, &policy, &LinkRelation::AttachPolicy)
            .await
            .unwrap();

        assert_eq!(provider.link_count("role/app", RelationKind::AttachPolicy), 1);
    }

    #[tokio::test]
    async fn enumerated_relations_are_prechecked_and_skipped() {
        let provider = MemoryProvider::new();
        let table = ResourceHandle::external(ResourceKind::RouteTable, "rtb-1");
        let subnet = ResourceHandle::external(ResourceKind::Subnet, "subnet-priv");

        ensure_link(&provider, &table, &subnet, &LinkRelation::SubnetAssociation)
            .await
            .unwrap();
        let calls_after_first = provider.link_call_count();
        ensure_link(&provider, &table, &subnet, &LinkRelation::SubnetAssociation)
            .await
            .unwrap();

        // Second call hit the pre-check; no further apply went out.
        assert_eq!(provider.link_call_count(), calls_after_first);
        assert_eq!(
            provider.link_count("rtb-1", RelationKind::SubnetAssociation),
            1
        );
    }

    #[tokio::test]
    async fn distinct_rules_on_one_group_both_apply() {
        let provider = MemoryProvider::new();
        let group = ResourceHandle::external(ResourceKind::SecurityGroup, "sg-1");
        let anywhere = ResourceHandle::external(ResourceKind::CidrBlock, "0.0.0.0/0");

        ensure_link(
            &provider,
            &group,
            &anywhere,
            &LinkRelation::IngressRule(RuleSpec::tcp(22)),
        )
        .await
        .unwrap();
        ensure_link(
            &provider,
            &group,
            &anywhere,
            &LinkRelation::IngressRule(RuleSpec::tcp(443)),
        )
        .await
        .unwrap();
        ensure_link(
            &provider,
            &group,
            &anywhere,
            &LinkRelation::IngressRule(RuleSpec::tcp(22)),
        )
        .await
        .unwrap();

        assert_eq!(provider.link_count("sg-1", RelationKind::IngressRule), 2);
    }

    #[tokio::test]
    async fn bucket_encryption_link_is_stable_across_reruns() {
        let provider = MemoryProvider::new();
        let bucket = provider
            .create(
                &ResourceKey::new("logs"),
                &ResourceDescriptor::Bucket(BucketSpec::default()),
            )
            .await
            .unwrap();
        let key = ResourceHandle::external(ResourceKind::KmsKey, "key-1");

        for _ in 0..2 {
            ensure_link(&provider, &bucket, &key, &LinkRelation::BucketEncryption)
                .await
                .unwrap();
        }
        assert_eq!(
            provider.link_count(&bucket.id, RelationKind::BucketEncryption),
            1
        );
    }
}
