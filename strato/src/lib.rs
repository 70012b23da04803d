mod config;

use std::{env, path::PathBuf};

use clap::{Parser, Subcommand};
use comfy_table::Table;
use thiserror::Error;
use url::Url;

use strato_image::ImageReference;
use strato_ingest::{HttpClient, IngestConfig, IngestError, RequestContext};
use strato_provider::{MemoryProvider, ResourceHandle};
use strato_provision::{
    CidrRule, EncryptedBucketOptions, FunctionDeployOptions, InstanceOptions, NatGatewayOptions,
    ProvisionError, deploy_function, deploy_with_image, provision_encrypted_bucket,
    provision_instance, provision_nat_gateway, unique_bucket_name, upload_object,
    verify_bucket_encryption,
};

pub use crate::config::{Config, ConfigError};

#[derive(Parser, Debug)]
#[command(name = "strato", version, about = "Strato CLI")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(long = "config", global = true)]
    pub config_path: Option<PathBuf>,

    #[arg(long = "log", global = true, default_value = "info")]
    pub log: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Provision a managed instance with its role, profile, and group
    Instance {
        /// Place the instance in the private subnet without a public address.
        #[arg(long)]
        private: bool,
    },
    /// Provision a NAT gateway and wire the private route table through it
    NatGateway,
    /// Build, push, and deploy the container-image function
    Function {
        /// Deploy an already-pushed image URI instead of building one.
        #[arg(long = "image")]
        image: Option<String>,
    },
    /// Provision a bucket encrypted with a managed key
    Bucket,
    /// Run the ingest handler once
    Ingest,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("missing config section: [{section}]")]
    MissingSection { section: &'static str },

    #[error("missing config value: {name}")]
    MissingValue { name: &'static str },

    #[error("invalid ingest URL: {0}")]
    InvalidIngestUrl(#[source] url::ParseError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Ingest(#[from] IngestError),
}

pub async fn get_config(cli: &Cli) -> Result<Config, AppError> {
    let config_path = cli
        .config_path
        .clone()
        .or_else(|| env::var("STRATO_CONFIG").ok().map(PathBuf::from))
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let config = Config::load(&config_path).await?;
    Ok(config)
}

/// Run a command against the in-memory provider backend. Real control
/// planes implement the provider trait out of tree; the flows are the same.
pub async fn run(cli: Cli) -> Result<(), AppError> {
    let config = get_config(&cli).await?;
    let provider = MemoryProvider::new();
    match cli.command {
        Command::Instance { private } => cmd_instance(config, &provider, private).await,
        Command::NatGateway => cmd_nat_gateway(config, &provider).await,
        Command::Function { image } => cmd_function(config, &provider, image).await,
        Command::Bucket => cmd_bucket(config, &provider).await,
        Command::Ingest => cmd_ingest(config, &provider).await,
    }
}

async fn cmd_instance(
    config: Config,
    provider: &MemoryProvider,
    private: bool,
) -> Result<(), AppError> {
    let network = config
        .network
        .as_ref()
        .ok_or(AppError::MissingSection { section: "network" })?;
    let instance = config
        .instance
        .as_ref()
        .ok_or(AppError::MissingSection { section: "instance" })?;

    let subnet_id = if private {
        network
            .private_subnet_id
            .clone()
            .ok_or(AppError::MissingValue {
                name: "network.private_subnet_id",
            })?
    } else {
        network.public_subnet_id.clone()
    };
    let ingress = if private {
        vec![]
    } else {
        vec![CidrRule {
            rule: strato_provider::RuleSpec::tcp(22),
            cidr: "0.0.0.0/0".to_owned(),
        }]
    };

    let options = InstanceOptions {
        role_name: instance.role_name.clone(),
        policy_id: instance.policy_id.clone(),
        profile_name: instance.profile_name.clone(),
        group_name: instance.group_name.clone(),
        group_description: instance.group_description.clone(),
        vpc_id: network.vpc_id.clone(),
        subnet_id,
        image_id: instance.image_id.clone(),
        instance_type: instance.instance_type.clone(),
        instance_name: instance.name.clone(),
        associate_public_ip: !private,
        user_data: instance.user_data.clone(),
        ingress,
        egress: vec![CidrRule::all_traffic_anywhere()],
    };

    let out = provision_instance(provider, &options, config.poll.options()).await?;
    print_handles(&[
        ("role", &out.role),
        ("instance-profile", &out.profile),
        ("security-group", &out.security_group),
        ("instance", &out.instance),
    ]);
    Ok(())
}

async fn cmd_nat_gateway(config: Config, provider: &MemoryProvider) -> Result<(), AppError> {
    let network = config
        .network
        .as_ref()
        .ok_or(AppError::MissingSection { section: "network" })?;
    let nat = config
        .nat
        .as_ref()
        .ok_or(AppError::MissingSection { section: "nat" })?;

    let options = NatGatewayOptions {
        eip_name: nat.eip_name.clone(),
        gateway_name: nat.gateway_name.clone(),
        public_subnet_id: network.public_subnet_id.clone(),
        private_subnet_id: network
            .private_subnet_id
            .clone()
            .ok_or(AppError::MissingValue {
                name: "network.private_subnet_id",
            })?,
        route_table_id: network
            .route_table_id
            .clone()
            .ok_or(AppError::MissingValue {
                name: "network.route_table_id",
            })?,
        destination: nat.destination.clone(),
    };

    let out = provision_nat_gateway(provider, &options, config.poll.options()).await?;
    print_handles(&[("elastic-ip", &out.elastic_ip), ("nat-gateway", &out.gateway)]);
    Ok(())
}

async fn cmd_function(
    config: Config,
    provider: &MemoryProvider,
    image: Option<String>,
) -> Result<(), AppError> {
    let function = config
        .function
        .as_ref()
        .ok_or(AppError::MissingSection { section: "function" })?;

    let options = FunctionDeployOptions {
        function_name: function.name.clone(),
        role_name: function.role_name.clone(),
        policy_id: function.policy_id.clone(),
        repository_name: function.repository.clone(),
        context_dir: function.context_dir.clone(),
        dockerfile: function.dockerfile.clone(),
        tag: function.tag.clone(),
        timeout_secs: function.timeout_secs,
        memory_mb: function.memory_mb,
        environment: function.environment.clone().into_iter().collect(),
        tags: function.tags.clone().into_iter().collect(),
    };

    let poll = config.poll.options();
    let out = match image {
        Some(uri) => {
            let reference = parse_image_reference(&uri);
            deploy_with_image(provider, &options, reference, poll).await?
        }
        None => deploy_function(provider, &options, poll).await?,
    };

    println!("image: {}", out.image);
    print_handles(&[
        ("role", &out.role),
        ("repository", &out.repository),
        ("function", &out.function),
    ]);
    Ok(())
}

async fn cmd_bucket(config: Config, provider: &MemoryProvider) -> Result<(), AppError> {
    let bucket = config
        .bucket
        .as_ref()
        .ok_or(AppError::MissingSection { section: "bucket" })?;

    let bucket_name = match (&bucket.name, &bucket.prefix) {
        (Some(name), _) => name.clone(),
        (None, Some(prefix)) => unique_bucket_name(prefix),
        (None, None) => {
            return Err(AppError::MissingValue {
                name: "bucket.name or bucket.prefix",
            });
        }
    };

    let options = EncryptedBucketOptions {
        key_name: bucket.key_name.clone(),
        key_description: bucket.key_description.clone(),
        bucket_name,
    };
    let out = provision_encrypted_bucket(provider, &options).await?;

    // Exercise the bucket end to end: write a probe object and confirm the
    // encryption link took.
    upload_object(
        provider,
        &out.bucket,
        "probe.txt",
        b"probe".to_vec(),
        "text/plain",
    )
    .await?;
    let encrypted = verify_bucket_encryption(provider, &out.bucket, &out.key).await?;
    println!("bucket encryption verified: {encrypted}");

    print_handles(&[("kms-key", &out.key), ("bucket", &out.bucket)]);
    Ok(())
}

async fn cmd_ingest(config: Config, provider: &MemoryProvider) -> Result<(), AppError> {
    let section = config
        .ingest
        .as_ref()
        .ok_or(AppError::MissingSection { section: "ingest" })?;
    let url = Url::parse(&section.url).map_err(AppError::InvalidIngestUrl)?;

    let ingest_config = IngestConfig::new(url, section.bucket.clone());
    let http = HttpClient::new().map_err(IngestError::from)?;
    let receipt = strato_ingest::handle(provider, &http, &ingest_config, &RequestContext::new())
        .await?;

    println!("stored {}/{}", receipt.bucket, receipt.object_key);
    Ok(())
}

fn parse_image_reference(uri: &str) -> ImageReference {
    match uri.rsplit_once(':') {
        // A colon inside the registry host:port is not a tag separator.
        Some((repository, tag)) if !tag.contains('/') => ImageReference::new(repository, tag),
        _ => ImageReference::new(uri, "latest"),
    }
}

fn print_handles(rows: &[(&str, &ResourceHandle)]) {
    let mut table = Table::new();
    table
        .load_preset(comfy_table::presets::UTF8_FULL)
        .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS)
        .set_content_arrangement(comfy_table::ContentArrangement::Dynamic)
        .set_header(vec!["resource", "id", "state"]);

    for (label, handle) in rows {
        table.add_row(vec![
            label.to_string(),
            handle.id.clone(),
            handle.state.to_string(),
        ]);
    }

    println!("{table}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_reference_parsing_handles_tags_and_ports() {
        let tagged = parse_image_reference("registry.test/app:v2");
        assert_eq!(tagged.repository_uri, "registry.test/app");
        assert_eq!(tagged.tag, "v2");

        let untagged = parse_image_reference("registry.test/app");
        assert_eq!(untagged.tag, "latest");

        let with_port = parse_image_reference("registry.test:5000/app");
        assert_eq!(with_port.repository_uri, "registry.test:5000/app");
        assert_eq!(with_port.tag, "latest");
    }
}
