use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::info;

use strato_ensure::{PollOptions, ensure, ensure_link, wait_until_available};
use strato_image::{ImageBuildOptions, ImageReference, build_and_push};
use strato_provider::{
    FunctionSpec, LinkRelation, Provider, RepositorySpec, ResourceDescriptor, ResourceHandle,
    ResourceKey, ResourceKind, RoleSpec,
};

use crate::ProvisionError;

pub const FUNCTION_SERVICE: &str = "lambda.amazonaws.com";

#[derive(Debug, Clone)]
pub struct FunctionDeployOptions {
    pub function_name: String,
    pub role_name: String,
    /// Execution policy attached to the role.
    pub policy_id: String,
    pub repository_name: String,
    pub context_dir: PathBuf,
    /// Dockerfile path relative to the context.
    pub dockerfile: PathBuf,
    pub tag: String,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub environment: IndexMap<String, String>,
    pub tags: IndexMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct FunctionDeployOutput {
    pub role: ResourceHandle,
    pub repository: ResourceHandle,
    pub function: ResourceHandle,
    pub image: ImageReference,
}

/// Full deployment: ensure the repository, build and push the image through
/// the external container tooling, then deploy the function from it.
pub async fn deploy_function<P>(
    provider: &P,
    options: &FunctionDeployOptions,
    poll: PollOptions,
) -> Result<FunctionDeployOutput, ProvisionError>
where
    P: Provider + ?Sized,
{
    let repository = ensure_repository(provider, options).await?;

    let auth = provider.registry_auth(&repository).await?;
    let image = build_and_push(
        &auth,
        &ImageBuildOptions {
            context_dir: options.context_dir.clone(),
            dockerfile: options.dockerfile.clone(),
            reference: ImageReference::new(repository.id.clone(), options.tag.clone()),
        },
    )
    .await?;

    deploy_with_image(provider, options, image, poll).await
}

/// Deploy from an already-pushed image. Separated so the control-plane half
/// of the flow does not require container tooling.
pub async fn deploy_with_image<P>(
    provider: &P,
    options: &FunctionDeployOptions,
    image: ImageReference,
    poll: PollOptions,
) -> Result<FunctionDeployOutput, ProvisionError>
where
    P: Provider + ?Sized,
{
    info!(role = %options.role_name, "ensuring execution role");
    let role = ensure(
        provider,
        &ResourceKey::new(&options.role_name),
        &ResourceDescriptor::Role(RoleSpec::service_trust(FUNCTION_SERVICE)),
    )
    .await?;
    let policy = ResourceHandle::external(ResourceKind::ManagedPolicy, &options.policy_id);
    ensure_link(provider, &role, &policy, &LinkRelation::AttachPolicy).await?;

    let repository = ensure_repository(provider, options).await?;

    info!(function = %options.function_name, image = %image, "ensuring function");
    let function = ensure(
        provider,
        &ResourceKey::new(&options.function_name),
        &ResourceDescriptor::Function(FunctionSpec {
            image_uri: image.uri(),
            role_id: role.id.clone(),
            timeout_secs: options.timeout_secs,
            memory_mb: options.memory_mb,
            environment: options.environment.clone(),
            tags: options.tags.clone(),
        }),
    )
    .await?;
    let function = wait_until_available(provider, &function, poll).await?;

    Ok(FunctionDeployOutput {
        role,
        repository,
        function,
        image,
    })
}

async fn ensure_repository<P>(
    provider: &P,
    options: &FunctionDeployOptions,
) -> Result<ResourceHandle, ProvisionError>
where
    P: Provider + ?Sized,
{
    info!(repository = %options.repository_name, "ensuring image repository");
    let repository = ensure(
        provider,
        &ResourceKey::new(&options.repository_name),
        &ResourceDescriptor::Repository(RepositorySpec::default()),
    )
    .await?;
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use strato_provider::{LifecycleState, MemoryProvider, RelationKind};

    fn options() -> FunctionDeployOptions {
        FunctionDeployOptions {
            function_name: "log-fn".to_owned(),
            role_name: "log-fn-role".to_owned(),
            policy_id: "arn:policy/basic-execution".to_owned(),
            repository_name: "log-fn-repo".to_owned(),
            context_dir: PathBuf::from("demo/function"),
            dockerfile: PathBuf::from("Dockerfile"),
            tag: "latest".to_owned(),
            timeout_secs: 30,
            memory_mb: 256,
            environment: IndexMap::from([("LOG_LEVEL".to_owned(), "INFO".to_owned())]),
            tags: IndexMap::new(),
        }
    }

    fn poll() -> PollOptions {
        PollOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn deploy_with_image_wires_role_repository_and_function() {
        let provider = MemoryProvider::new();
        let image = ImageReference::new("registry.memory.test/log-fn-repo", "latest");

        let out = deploy_with_image(&provider, &options(), image, poll())
            .await
            .unwrap();

        assert_eq!(out.function.state, LifecycleState::Available);
        assert_eq!(provider.create_count(ResourceKind::Role), 1);
        assert_eq!(provider.create_count(ResourceKind::Repository), 1);
        assert_eq!(provider.create_count(ResourceKind::Function), 1);
        assert_eq!(
            provider.link_count(&out.role.id, RelationKind::AttachPolicy),
            1
        );
    }

    #[tokio::test]
    async fn redeploying_the_same_image_creates_nothing_new() {
        let provider = MemoryProvider::new();
        let image = ImageReference::new("registry.memory.test/log-fn-repo", "latest");

        let first = deploy_with_image(&provider, &options(), image.clone(), poll())
            .await
            .unwrap();
        let second = deploy_with_image(&provider, &options(), image, poll())
            .await
            .unwrap();

        assert_eq!(first.function.id, second.function.id);
        assert_eq!(provider.total_create_calls(), 3);
    }
}
