mod client;
mod error;
mod handle;
mod key;
pub mod kinds;
mod link;
mod memory;

pub use client::{Provider, RegistryAuth, StoredObject};
pub use error::ProviderError;
pub use handle::{LifecycleState, ResourceHandle};
pub use key::ResourceKey;
pub use kinds::compute::{InstanceSpec, Tag};
pub use kinds::function::FunctionSpec;
pub use kinds::identity::{InstanceProfileSpec, RoleSpec};
pub use kinds::network::{ElasticIpSpec, NatGatewaySpec, RuleSpec, SecurityGroupSpec};
pub use kinds::registry::RepositorySpec;
pub use kinds::storage::{BucketSpec, KmsKeySpec};
pub use link::{Link, LinkEnumeration, LinkRelation, RelationKind};
pub use memory::MemoryProvider;

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Every resource family the provider surface knows how to address.
///
/// Some kinds are only ever referenced (route tables, subnets, managed
/// policies, CIDR blocks): their handles are constructed from configuration
/// with [`ResourceHandle::external`] rather than created here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    SecurityGroup,
    Role,
    ManagedPolicy,
    InstanceProfile,
    ElasticIp,
    NatGateway,
    RouteTable,
    Subnet,
    CidrBlock,
    Instance,
    Repository,
    Function,
    KmsKey,
    Bucket,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        use ResourceKind::*;
        match self {
            SecurityGroup => "security-group",
            Role => "role",
            ManagedPolicy => "managed-policy",
            InstanceProfile => "instance-profile",
            ElasticIp => "elastic-ip",
            NatGateway => "nat-gateway",
            RouteTable => "route-table",
            Subnet => "subnet",
            CidrBlock => "cidr-block",
            Instance => "instance",
            Repository => "repository",
            Function => "function",
            KmsKey => "kms-key",
            Bucket => "bucket",
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired-state attributes submitted with a creation attempt.
///
/// Immutable once submitted: `create` takes it by reference and an existing
/// resource is never reconciled against a newer descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDescriptor {
    SecurityGroup(SecurityGroupSpec),
    Role(RoleSpec),
    InstanceProfile(InstanceProfileSpec),
    ElasticIp(ElasticIpSpec),
    NatGateway(NatGatewaySpec),
    Instance(InstanceSpec),
    Repository(RepositorySpec),
    Function(FunctionSpec),
    KmsKey(KmsKeySpec),
    Bucket(BucketSpec),
}

impl ResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        use ResourceDescriptor::*;
        match self {
            SecurityGroup(_) => ResourceKind::SecurityGroup,
            Role(_) => ResourceKind::Role,
            InstanceProfile(_) => ResourceKind::InstanceProfile,
            ElasticIp(_) => ResourceKind::ElasticIp,
            NatGateway(_) => ResourceKind::NatGateway,
            Instance(_) => ResourceKind::Instance,
            Repository(_) => ResourceKind::Repository,
            Function(_) => ResourceKind::Function,
            KmsKey(_) => ResourceKind::KmsKey,
            Bucket(_) => ResourceKind::Bucket,
        }
    }
}
