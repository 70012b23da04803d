use serde::{Deserialize, Serialize};

/// Desired security group attributes. The group's rules are attached as
/// links after creation, not carried in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupSpec {
    pub description: String,
    pub vpc_id: String,
}

/// One ingress or egress rule. The CIDR target is the link's child; this is
/// the edge payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Provider protocol token; `-1` means all protocols.
    pub protocol: String,
    pub from_port: i32,
    pub to_port: i32,
}

impl RuleSpec {
    /// All traffic, all ports.
    pub fn all_traffic() -> Self {
        Self {
            protocol: "-1".to_owned(),
            from_port: -1,
            to_port: -1,
        }
    }

    pub fn tcp(port: i32) -> Self {
        Self {
            protocol: "tcp".to_owned(),
            from_port: port,
            to_port: port,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticIpSpec {
    pub domain: String,
}

impl Default for ElasticIpSpec {
    fn default() -> Self {
        Self {
            domain: "vpc".to_owned(),
        }
    }
}

/// A NAT gateway is created in a public subnet against an allocated
/// elastic IP, then settles asynchronously from pending to available.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatGatewaySpec {
    pub subnet_id: String,
    pub allocation_id: String,
}
