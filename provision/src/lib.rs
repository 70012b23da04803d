mod bucket;
mod function;
mod instance;
mod nat;

pub use bucket::{
    EncryptedBucketOptions, EncryptedBucketOutput, download_object, provision_encrypted_bucket,
    unique_bucket_name, upload_object, verify_bucket_encryption, verify_object_encryption,
};
pub use function::{
    FUNCTION_SERVICE, FunctionDeployOptions, FunctionDeployOutput, deploy_function,
    deploy_with_image,
};
pub use instance::{
    CidrRule, EC2_SERVICE, InstanceOptions, InstanceOutput, provision_instance,
};
pub use nat::{NatGatewayOptions, NatGatewayOutput, provision_nat_gateway};

use thiserror::Error;

use strato_ensure::{EnsureError, WaitError};
use strato_image::ImageError;
use strato_provider::ProviderError;

/// Failures across a flow. A failing step leaves every earlier successful
/// step's resources intact; there is no rollback.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Ensure(#[from] EnsureError),

    #[error(transparent)]
    Wait(#[from] WaitError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Image(#[from] ImageError),
}
