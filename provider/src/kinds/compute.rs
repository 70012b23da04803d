use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn name(value: impl Into<String>) -> Self {
        Self {
            key: "Name".to_owned(),
            value: value.into(),
        }
    }
}

/// Desired instance attributes. Security groups are attached as links after
/// creation; the instance profile is wired at creation time by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub image_id: String,
    pub instance_type: String,
    pub subnet_id: String,
    pub associate_public_ip: bool,
    pub instance_profile: Option<String>,
    /// Bootstrap script run on first boot.
    pub user_data: Option<String>,
    pub tags: Vec<Tag>,
}
