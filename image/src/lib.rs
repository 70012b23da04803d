use std::fmt::{self, Display};
use std::path::PathBuf;

use base64ct::{Base64, Encoding};
use thiserror::Error;
use tracing::info;

use strato_cmd::{Command, CommandError};
use strato_provider::RegistryAuth;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("registry authorization token is not valid base64")]
    TokenEncoding(#[source] base64ct::Error),

    /// The decoded token must be `username:password`.
    #[error("registry authorization token is malformed")]
    TokenShape,
}

/// A pushed (or pushable) image reference: `repository-uri:tag`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub repository_uri: String,
    pub tag: String,
}

impl ImageReference {
    pub fn new(repository_uri: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository_uri: repository_uri.into(),
            tag: tag.into(),
        }
    }

    pub fn uri(&self) -> String {
        format!("{}:{}", self.repository_uri, self.tag)
    }
}

impl Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository_uri, self.tag)
    }
}

#[derive(Debug, Clone)]
pub struct RegistryLogin {
    pub username: String,
    pub password: String,
    pub endpoint: String,
}

/// Decode a provider-issued authorization token (base64 `user:password`)
/// into login credentials.
pub fn decode_auth(auth: &RegistryAuth) -> Result<RegistryLogin, ImageError> {
    let decoded =
        Base64::decode_vec(&auth.authorization_token).map_err(ImageError::TokenEncoding)?;
    let decoded = String::from_utf8(decoded).map_err(|_| ImageError::TokenShape)?;
    let (username, password) = decoded.split_once(':').ok_or(ImageError::TokenShape)?;
    Ok(RegistryLogin {
        username: username.to_owned(),
        password: password.to_owned(),
        endpoint: auth.endpoint.clone(),
    })
}

#[derive(Debug, Clone)]
pub struct ImageBuildOptions {
    /// Docker build context directory.
    pub context_dir: PathBuf,
    /// Dockerfile path relative to the context.
    pub dockerfile: PathBuf,
    pub reference: ImageReference,
}

/// Log in to the registry, password over stdin.
pub async fn login(login: &RegistryLogin) -> Result<(), ImageError> {
    info!(endpoint = %login.endpoint, "logging in to registry");
    Command::new("docker")
        .arg("login")
        .arg("--username")
        .arg(&login.username)
        .arg("--password-stdin")
        .arg(&login.endpoint)
        .run_with_input(login.password.as_bytes())
        .await?;
    Ok(())
}

pub async fn build(options: &ImageBuildOptions) -> Result<ImageReference, ImageError> {
    info!(image = %options.reference.uri(), "building image");
    Command::new("docker")
        .arg("build")
        .arg("-t")
        .arg(options.reference.uri())
        .arg("-f")
        .arg(&options.dockerfile)
        .arg(".")
        .current_dir(&options.context_dir)
        .stdout(true)
        .run()
        .await?;
    Ok(options.reference.clone())
}

pub async fn push(reference: &ImageReference) -> Result<(), ImageError> {
    info!(image = %reference.uri(), "pushing image");
    Command::new("docker")
        .arg("push")
        .arg(reference.uri())
        .stdout(true)
        .run()
        .await?;
    Ok(())
}

/// Authenticate, build, and push in one go, returning the pushed reference.
pub async fn build_and_push(
    auth: &RegistryAuth,
    options: &ImageBuildOptions,
) -> Result<ImageReference, ImageError> {
    let credentials = decode_auth(auth)?;
    login(&credentials).await?;
    let reference = build(options).await?;
    push(&reference).await?;
    Ok(reference)
}
