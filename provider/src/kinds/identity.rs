use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Desired role attributes: the trust document is provider-schema JSON and
/// passed through opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub trust: Value,
}

impl RoleSpec {
    /// Trust document allowing one provider service to assume the role.
    pub fn service_trust(service: &str) -> Self {
        Self {
            trust: json!({
                "Version": "2012-10-17",
                "Statement": [
                    {
                        "Effect": "Allow",
                        "Principal": { "Service": service },
                        "Action": "sts:AssumeRole",
                    }
                ],
            }),
        }
    }
}

/// An instance profile is a named shell; its role is attached as a link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceProfileSpec {
    pub path: Option<String>,
}
