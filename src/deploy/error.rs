// ABOUTME: Umbrella error for deployment orchestration.
// ABOUTME: Wraps the phase-specific errors and adds orchestrator-level refusals.

use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::exec::{ImageBuildError, TerraformError};
use crate::provider::ProviderError;
use crate::workflow::WorkflowError;

#[derive(Debug, Error)]
pub enum DeployError {
    /// A deployment record already exists for this preset. Refused before any
    /// provider contact.
    #[error("preset '{preset}' is already deployed at {address}; shut it down first")]
    AlreadyDeployed { preset: String, address: String },

    /// A secret named in `required_env` is not exported.
    #[error("required environment variable '{0}' is not set")]
    MissingSecret(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),

    #[error(transparent)]
    Terraform(#[from] TerraformError),

    #[error(transparent)]
    ImageBuild(#[from] ImageBuildError),

    #[error(transparent)]
    Config(#[from] crate::error::Error),

    #[error("failed to persist deployment state: {0}")]
    Persist(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeployError>;
