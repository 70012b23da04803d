use std::fmt::{self, Display};

use crate::kinds::network::RuleSpec;

/// A directed attachment edge between two resources.
///
/// Variants carry the relation payload where the edge itself has attributes
/// (rule details, route destination). Re-applying an edge must not duplicate
/// it; the provider either enumerates existing edges or reports a duplicate
/// on a second apply.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkRelation {
    /// Role -> managed policy.
    AttachPolicy,
    /// Instance profile -> role.
    RoleInProfile,
    /// Security group -> CIDR block, inbound.
    IngressRule(RuleSpec),
    /// Security group -> CIDR block, outbound.
    EgressRule(RuleSpec),
    /// Route table -> gateway, for a destination block.
    DefaultRoute { destination: String },
    /// Route table -> subnet.
    SubnetAssociation,
    /// Instance -> security group.
    SecurityGroupMembership,
    /// Bucket -> KMS key used for default encryption.
    BucketEncryption,
}

impl LinkRelation {
    pub fn kind(&self) -> RelationKind {
        use LinkRelation::*;
        match self {
            AttachPolicy => RelationKind::AttachPolicy,
            RoleInProfile => RelationKind::RoleInProfile,
            IngressRule(_) => RelationKind::IngressRule,
            EgressRule(_) => RelationKind::EgressRule,
            DefaultRoute { .. } => RelationKind::DefaultRoute,
            SubnetAssociation => RelationKind::SubnetAssociation,
            SecurityGroupMembership => RelationKind::SecurityGroupMembership,
            BucketEncryption => RelationKind::BucketEncryption,
        }
    }
}

/// The relation discriminant, without payload. Used to ask a provider for
/// its existing edges of one flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    AttachPolicy,
    RoleInProfile,
    IngressRule,
    EgressRule,
    DefaultRoute,
    SubnetAssociation,
    SecurityGroupMembership,
    BucketEncryption,
}

impl Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use RelationKind::*;
        let s = match self {
            AttachPolicy => "attach-policy",
            RoleInProfile => "role-in-profile",
            IngressRule => "ingress-rule",
            EgressRule => "egress-rule",
            DefaultRoute => "default-route",
            SubnetAssociation => "subnet-association",
            SecurityGroupMembership => "security-group-membership",
            BucketEncryption => "bucket-encryption",
        };
        f.write_str(s)
    }
}

/// An existing edge, as enumerated by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub parent_id: String,
    pub child_id: String,
    pub relation: LinkRelation,
}

/// Result of asking a provider for existing edges of one relation kind.
///
/// Not every relation is enumerable: some attachments are only observable by
/// attempting them and watching for a duplicate error.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEnumeration {
    Links(Vec<Link>),
    Unsupported,
}
