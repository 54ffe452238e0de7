// ABOUTME: Deployment orchestration: records, health probing, and the orchestrator.
// ABOUTME: The orchestrator is the only writer of deployment records.

mod error;
mod orchestrator;
mod records;
mod status;

pub use error::{DeployError, Result};
pub use orchestrator::{Orchestrator, ProvisionerFactory};
pub use records::{DeploymentRecord, DeploymentStore};
pub use status::{StatusReport, probe};
