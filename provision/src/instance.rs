use tracing::info;

use strato_ensure::{PollOptions, ensure, ensure_link, wait_until_available};
use strato_provider::{
    InstanceProfileSpec, InstanceSpec, LinkRelation, Provider, ResourceDescriptor, ResourceHandle,
    ResourceKey, ResourceKind, RoleSpec, RuleSpec, SecurityGroupSpec, Tag,
};

use crate::ProvisionError;

pub const EC2_SERVICE: &str = "ec2.amazonaws.com";

/// A rule plus the CIDR block it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrRule {
    pub rule: RuleSpec,
    pub cidr: String,
}

impl CidrRule {
    pub fn all_traffic_anywhere() -> Self {
        Self {
            rule: RuleSpec::all_traffic(),
            cidr: "0.0.0.0/0".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceOptions {
    pub role_name: String,
    /// Managed policy id to attach to the role.
    pub policy_id: String,
    pub profile_name: String,
    pub group_name: String,
    pub group_description: String,
    pub vpc_id: String,
    pub subnet_id: String,
    pub image_id: String,
    pub instance_type: String,
    pub instance_name: String,
    pub associate_public_ip: bool,
    pub user_data: Option<String>,
    pub ingress: Vec<CidrRule>,
    pub egress: Vec<CidrRule>,
}

#[derive(Debug, Clone)]
pub struct InstanceOutput {
    pub role: ResourceHandle,
    pub profile: ResourceHandle,
    pub security_group: ResourceHandle,
    pub instance: ResourceHandle,
}

/// Provision a managed instance: role with attached policy, instance
/// profile, security group with rules, then the instance itself, waited to
/// running. Every step reuses what already exists.
pub async fn provision_instance<P>(
    provider: &P,
    options: &InstanceOptions,
    poll: PollOptions,
) -> Result<InstanceOutput, ProvisionError>
where
    P: Provider + ?Sized,
{
    info!(role = %options.role_name, "ensuring role");
    let role = ensure(
        provider,
        &ResourceKey::new(&options.role_name),
        &ResourceDescriptor::Role(RoleSpec::service_trust(EC2_SERVICE)),
    )
    .await?;

    let policy = ResourceHandle::external(ResourceKind::ManagedPolicy, &options.policy_id);
    ensure_link(provider, &role, &policy, &LinkRelation::AttachPolicy).await?;

    info!(profile = %options.profile_name, "ensuring instance profile");
    let profile = ensure(
        provider,
        &ResourceKey::new(&options.profile_name),
        &ResourceDescriptor::InstanceProfile(InstanceProfileSpec::default()),
    )
    .await?;
    ensure_link(provider, &profile, &role, &LinkRelation::RoleInProfile).await?;

    info!(group = %options.group_name, vpc = %options.vpc_id, "ensuring security group");
    let security_group = ensure(
        provider,
        &ResourceKey::scoped(&options.group_name, &options.vpc_id),
        &ResourceDescriptor::SecurityGroup(SecurityGroupSpec {
            description: options.group_description.clone(),
            vpc_id: options.vpc_id.clone(),
        }),
    )
    .await?;

    for CidrRule { rule, cidr } in &options.ingress {
        let block = ResourceHandle::external(ResourceKind::CidrBlock, cidr);
        ensure_link(
            provider,
            &security_group,
            &block,
            &LinkRelation::IngressRule(rule.clone()),
        )
        .await?;
    }
    for CidrRule { rule, cidr } in &options.egress {
        let block = ResourceHandle::external(ResourceKind::CidrBlock, cidr);
        ensure_link(
            provider,
            &security_group,
            &block,
            &LinkRelation::EgressRule(rule.clone()),
        )
        .await?;
    }

    info!(name = %options.instance_name, "ensuring instance");
    let instance = ensure(
        provider,
        &ResourceKey::scoped(&options.instance_name, &options.subnet_id),
        &ResourceDescriptor::Instance(InstanceSpec {
            image_id: options.image_id.clone(),
            instance_type: options.instance_type.clone(),
            subnet_id: options.subnet_id.clone(),
            associate_public_ip: options.associate_public_ip,
            instance_profile: Some(options.profile_name.clone()),
            user_data: options.user_data.clone(),
            tags: vec![Tag::name(&options.instance_name)],
        }),
    )
    .await?;
    ensure_link(
        provider,
        &instance,
        &security_group,
        &LinkRelation::SecurityGroupMembership,
    )
    .await?;

    let instance = wait_until_available(provider, &instance, poll).await?;

    Ok(InstanceOutput {
        role,
        profile,
        security_group,
        instance,
    })
}
