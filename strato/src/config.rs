use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs::read_to_string;

use strato_ensure::PollOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to resolve build context path: {base_path} + {context_dir}")]
    ResolvingContextDir {
        base_path: PathBuf,
        context_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct ConfigToml {
    pub network: Option<NetworkConfig>,
    pub instance: Option<InstanceConfig>,
    pub nat: Option<NatConfig>,
    pub function: Option<FunctionConfigToml>,
    pub bucket: Option<BucketConfig>,
    pub ingest: Option<IngestSection>,
    #[serde(default)]
    pub poll: PollConfig,
}

/// Identifiers of the pre-existing network this run provisions into. These
/// were hardcoded placeholder constants in an earlier life; they are
/// explicit configuration now.
#[derive(Debug, Clone, Deserialize)]
pub struct NetworkConfig {
    pub vpc_id: String,
    pub public_subnet_id: String,
    pub private_subnet_id: Option<String>,
    pub route_table_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub name: String,
    pub image_id: String,
    #[serde(default = "default_instance_type")]
    pub instance_type: String,
    pub role_name: String,
    pub profile_name: String,
    pub group_name: String,
    #[serde(default = "default_group_description")]
    pub group_description: String,
    pub policy_id: String,
    pub user_data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NatConfig {
    #[serde(default = "default_eip_name")]
    pub eip_name: String,
    #[serde(default = "default_gateway_name")]
    pub gateway_name: String,
    #[serde(default = "default_destination")]
    pub destination: String,
}

#[derive(Debug, Clone, Deserialize)]
struct FunctionConfigToml {
    pub name: String,
    pub role_name: String,
    pub policy_id: String,
    pub repository: String,
    pub context_dir: PathBuf,
    #[serde(default = "default_dockerfile")]
    pub dockerfile: PathBuf,
    #[serde(default = "default_tag")]
    pub tag: String,
    #[serde(default = "default_function_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_function_memory")]
    pub memory_mb: u32,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct FunctionConfig {
    pub name: String,
    pub role_name: String,
    pub policy_id: String,
    pub repository: String,
    /// Absolute build context, resolved against the config file location.
    pub context_dir: PathBuf,
    pub dockerfile: PathBuf,
    pub tag: String,
    pub timeout_secs: u32,
    pub memory_mb: u32,
    pub environment: BTreeMap<String, String>,
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BucketConfig {
    pub key_name: String,
    #[serde(default = "default_key_description")]
    pub key_description: String,
    /// Fixed bucket name; when absent a unique one is minted from `prefix`.
    pub name: Option<String>,
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestSection {
    pub url: String,
    pub bucket: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

impl PollConfig {
    pub fn options(&self) -> PollOptions {
        PollOptions {
            interval: Duration::from_secs(self.interval_secs),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub path: PathBuf,
    pub network: Option<NetworkConfig>,
    pub instance: Option<InstanceConfig>,
    pub nat: Option<NatConfig>,
    pub function: Option<FunctionConfig>,
    pub bucket: Option<BucketConfig>,
    pub ingest: Option<IngestSection>,
    pub poll: PollConfig,
}

impl Config {
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let path = if path.is_dir() {
            path.join("strato.toml")
        } else {
            path.to_owned()
        };
        let config = Self::load_config(&path).await?;
        let ConfigToml {
            network,
            instance,
            nat,
            function,
            bucket,
            ingest,
            poll,
        } = config;
        let function = function
            .map(|function| Self::resolve_function(&path, function))
            .transpose()?;
        Ok(Config {
            path,
            network,
            instance,
            nat,
            function,
            bucket,
            ingest,
            poll,
        })
    }

    async fn load_config(path: &Path) -> Result<ConfigToml, ConfigError> {
        let string = read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?;
        let config = toml::from_str(&string).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        Ok(config)
    }

    fn resolve_function(
        base_path: &Path,
        function: FunctionConfigToml,
    ) -> Result<FunctionConfig, ConfigError> {
        let FunctionConfigToml {
            name,
            role_name,
            policy_id,
            repository,
            context_dir,
            dockerfile,
            tag,
            timeout_secs,
            memory_mb,
            environment,
            tags,
        } = function;
        let context_dir = if context_dir.is_absolute() {
            context_dir
        } else {
            base_path
                .parent()
                .map(|parent| parent.join(&context_dir))
                .ok_or_else(|| ConfigError::ResolvingContextDir {
                    base_path: base_path.to_owned(),
                    context_dir: context_dir.clone(),
                })?
        };
        Ok(FunctionConfig {
            name,
            role_name,
            policy_id,
            repository,
            context_dir,
            dockerfile,
            tag,
            timeout_secs,
            memory_mb,
            environment,
            tags,
        })
    }
}

fn default_instance_type() -> String {
    "t2.micro".to_owned()
}

fn default_group_description() -> String {
    "managed by strato".to_owned()
}

fn default_key_description() -> String {
    "bucket default encryption key".to_owned()
}

fn default_eip_name() -> String {
    "nat-eip".to_owned()
}

fn default_gateway_name() -> String {
    "nat-main".to_owned()
}

fn default_destination() -> String {
    "0.0.0.0/0".to_owned()
}

fn default_dockerfile() -> PathBuf {
    PathBuf::from("Dockerfile")
}

fn default_tag() -> String {
    "latest".to_owned()
}

fn default_function_timeout() -> u32 {
    30
}

fn default_function_memory() -> u32 {
    256
}

fn default_poll_interval() -> u64 {
    5
}

fn default_poll_timeout() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[network]
vpc_id = "vpc-1"
public_subnet_id = "subnet-pub"
private_subnet_id = "subnet-priv"
route_table_id = "rtb-1"

[instance]
name = "session-instance"
image_id = "ami-1234"
role_name = "instance-role"
profile_name = "instance-profile"
group_name = "session-sg"
policy_id = "arn:policy/managed-core"

[nat]

[bucket]
key_name = "bucket-key"
prefix = "artifacts"

[poll]
interval_secs = 1
timeout_secs = 10
"#;

    #[test]
    fn sample_config_parses_with_defaults() {
        let config: ConfigToml = toml::from_str(SAMPLE).unwrap();

        let network = config.network.unwrap();
        assert_eq!(network.vpc_id, "vpc-1");
        assert_eq!(network.route_table_id.as_deref(), Some("rtb-1"));

        let instance = config.instance.unwrap();
        assert_eq!(instance.instance_type, "t2.micro");
        assert!(instance.user_data.is_none());

        let nat = config.nat.unwrap();
        assert_eq!(nat.destination, "0.0.0.0/0");

        let bucket = config.bucket.unwrap();
        assert_eq!(bucket.key_description, "bucket default encryption key");
        assert_eq!(bucket.prefix.as_deref(), Some("artifacts"));
        assert!(bucket.name.is_none());

        assert_eq!(config.poll.interval_secs, 1);
        assert!(config.function.is_none());
    }

    #[test]
    fn missing_poll_section_uses_defaults() {
        let config: ConfigToml = toml::from_str("[nat]\n").unwrap();
        assert_eq!(config.poll.interval_secs, 5);
        assert_eq!(config.poll.timeout_secs, 300);
    }
}
