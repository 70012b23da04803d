use tracing::info;
use uuid::Uuid;

use strato_ensure::{ensure, ensure_link};
use strato_provider::{
    BucketSpec, KmsKeySpec, LinkEnumeration, LinkRelation, Provider, RelationKind,
    ResourceDescriptor, ResourceHandle, ResourceKey, StoredObject,
};

use crate::ProvisionError;

#[derive(Debug, Clone)]
pub struct EncryptedBucketOptions {
    /// Stable key for the encryption key, so reruns find it again.
    pub key_name: String,
    pub key_description: String,
    pub bucket_name: String,
}

#[derive(Debug, Clone)]
pub struct EncryptedBucketOutput {
    pub key: ResourceHandle,
    pub bucket: ResourceHandle,
}

/// Mint a globally unique bucket name from a prefix.
pub fn unique_bucket_name(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Provision a bucket whose default encryption uses a managed key: ensure
/// the key, ensure the bucket, link the two.
pub async fn provision_encrypted_bucket<P>(
    provider: &P,
    options: &EncryptedBucketOptions,
) -> Result<EncryptedBucketOutput, ProvisionError>
where
    P: Provider + ?Sized,
{
    info!(key = %options.key_name, "ensuring encryption key");
    let key = ensure(
        provider,
        &ResourceKey::new(&options.key_name),
        &ResourceDescriptor::KmsKey(KmsKeySpec {
            description: options.key_description.clone(),
        }),
    )
    .await?;

    info!(bucket = %options.bucket_name, "ensuring bucket");
    let bucket = ensure(
        provider,
        &ResourceKey::new(&options.bucket_name),
        &ResourceDescriptor::Bucket(BucketSpec::default()),
    )
    .await?;

    ensure_link(provider, &bucket, &key, &LinkRelation::BucketEncryption).await?;

    Ok(EncryptedBucketOutput { key, bucket })
}

pub async fn upload_object<P>(
    provider: &P,
    bucket: &ResourceHandle,
    object_key: &str,
    body: Vec<u8>,
    content_type: &str,
) -> Result<(), ProvisionError>
where
    P: Provider + ?Sized,
{
    provider
        .put_object(bucket, object_key, body, content_type)
        .await?;
    info!(bucket = %bucket.id, object = %object_key, "uploaded object");
    Ok(())
}

pub async fn download_object<P>(
    provider: &P,
    bucket: &ResourceHandle,
    object_key: &str,
) -> Result<StoredObject, ProvisionError>
where
    P: Provider + ?Sized,
{
    Ok(provider.get_object(bucket, object_key).await?)
}

/// True if the bucket's default encryption is linked to the given key.
pub async fn verify_bucket_encryption<P>(
    provider: &P,
    bucket: &ResourceHandle,
    key: &ResourceHandle,
) -> Result<bool, ProvisionError>
where
    P: Provider + ?Sized,
{
    match provider
        .links(bucket, RelationKind::BucketEncryption)
        .await?
    {
        LinkEnumeration::Links(links) => Ok(links.iter().any(|link| link.child_id == key.id)),
        LinkEnumeration::Unsupported => Ok(false),
    }
}

/// True if a stored object reports being encrypted with the given key.
pub async fn verify_object_encryption<P>(
    provider: &P,
    bucket: &ResourceHandle,
    object_key: &str,
    key: &ResourceHandle,
) -> Result<bool, ProvisionError>
where
    P: Provider + ?Sized,
{
    let object = provider.get_object(bucket, object_key).await?;
    Ok(object.encrypted_with.as_deref() == Some(key.id.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use strato_provider::{MemoryProvider, ResourceKind};

    fn options() -> EncryptedBucketOptions {
        EncryptedBucketOptions {
            key_name: "bucket-key".to_owned(),
            key_description: "default encryption key".to_owned(),
            bucket_name: "artifacts-test".to_owned(),
        }
    }

    #[tokio::test]
    async fn bucket_and_key_are_linked_and_verified() {
        let provider = MemoryProvider::new();
        let out = provision_encrypted_bucket(&provider, &options())
            .await
            .unwrap();

        assert!(
            verify_bucket_encryption(&provider, &out.bucket, &out.key)
                .await
                .unwrap()
        );

        upload_object(
            &provider,
            &out.bucket,
            "report.txt",
            b"confidential".to_vec(),
            "text/plain",
        )
        .await
        .unwrap();
        assert!(
            verify_object_encryption(&provider, &out.bucket, "report.txt", &out.key)
                .await
                .unwrap()
        );

        let fetched = download_object(&provider, &out.bucket, "report.txt")
            .await
            .unwrap();
        assert_eq!(fetched.body, b"confidential");
    }

    #[tokio::test]
    async fn rerunning_reuses_key_bucket_and_link() {
        let provider = MemoryProvider::new();
        let first = provision_encrypted_bucket(&provider, &options())
            .await
            .unwrap();
        let second = provision_encrypted_bucket(&provider, &options())
            .await
            .unwrap();

        assert_eq!(first.key.id, second.key.id);
        assert_eq!(first.bucket.id, second.bucket.id);
        assert_eq!(provider.create_count(ResourceKind::KmsKey), 1);
        assert_eq!(provider.create_count(ResourceKind::Bucket), 1);
        assert_eq!(
            provider.link_count(&first.bucket.id, RelationKind::BucketEncryption),
            1
        );
    }

    #[test]
    fn unique_bucket_names_differ_per_call() {
        let a = unique_bucket_name("artifacts");
        let b = unique_bucket_name("artifacts");
        assert!(a.starts_with("artifacts-"));
        assert_ne!(a, b);
    }
}
