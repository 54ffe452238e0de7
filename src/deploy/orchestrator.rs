// ABOUTME: End-to-end deployment orchestration: provision, bootstrap, verify, teardown.
// ABOUTME: Drives the workflow state machine through every phase and persists progress.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::bootstrap::{Bootstrap, SshBootstrap};
use crate::config::{Credentials, Preset};
use crate::exec::{ImageBuilder, ProcessRunner, Terraform};
use crate::provider::{HttpTransport, Provisioner};
use crate::workflow::{StateMachine, StateStore, TransitionTable, WorkflowError, WorkflowState};

use super::error::{DeployError, Result};
use super::records::{DeploymentRecord, DeploymentStore};
use super::status::{StatusReport, probe};

/// Builds a provider client for a preset's region using resolved credentials.
pub type ProvisionerFactory = Box<dyn Fn(&Credentials, &Preset) -> Provisioner + Send + Sync>;

/// Drives a preset through its full lifecycle.
///
/// Both the provider client and the host bootstrap are injected, so the whole
/// deploy path runs against fakes in tests.
pub struct Orchestrator {
    presets_dir: PathBuf,
    state_dir: PathBuf,
    provisioner_factory: ProvisionerFactory,
    bootstrap: Box<dyn Bootstrap>,
}

impl Orchestrator {
    pub fn new(presets_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            presets_dir: presets_dir.into(),
            state_dir: state_dir.into(),
            provisioner_factory: Box::new(|credentials, preset| {
                Provisioner::new(
                    Box::new(HttpTransport::new(credentials.api_key.clone())),
                    preset.region.clone(),
                )
            }),
            bootstrap: Box::new(SshBootstrap),
        }
    }

    pub fn with_provisioner_factory(mut self, factory: ProvisionerFactory) -> Self {
        self.provisioner_factory = factory;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: Box<dyn Bootstrap>) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    fn deployments(&self) -> DeploymentStore {
        DeploymentStore::new(self.state_dir.join("deployments.json"))
    }

    /// Each preset gets its own workflow file so two presets deploy and shut
    /// down independently.
    fn machine_for(&self, preset: &Preset) -> StateMachine {
        let path = self.state_dir.join(format!("workflow-{}.json", preset.name));
        StateMachine::load(
            StateStore::new(path),
            WorkflowState::Idle,
            TransitionTable::default(),
        )
    }

    /// Deploy a preset: provision an instance, wait for its address, bootstrap
    /// the host, launch the workload, and verify its health endpoint.
    ///
    /// Refuses before any provider contact when the preset is already
    /// deployed or a required secret is missing. On failure the workflow is
    /// moved to the error state with the failure reason and the original
    /// error is returned.
    pub async fn deploy(&self, preset_name: &str) -> Result<DeploymentRecord> {
        let preset = Preset::load(&self.presets_dir, preset_name)?;

        for var in &preset.required_env {
            if std::env::var(var).is_err() {
                return Err(DeployError::MissingSecret(var.clone()));
            }
        }

        let deployments = self.deployments();
        if let Some(existing) = deployments.get(preset.name.as_str()) {
            return Err(DeployError::AlreadyDeployed {
                preset: existing.preset,
                address: existing.address,
            });
        }

        let credentials = Credentials::resolve(&preset)?;
        let mut machine = self.machine_for(&preset);

        // A previous attempt may have parked the workflow in a terminal
        // recovery state; both lead back to idle, so a retry can start over.
        if matches!(
            machine.current_state(),
            WorkflowState::Error | WorkflowState::Shutdown
        ) {
            machine.transition(WorkflowState::Idle, BTreeMap::new())?;
        }

        let mut context = BTreeMap::new();
        context.insert("preset".to_string(), preset.name.to_string());
        machine.transition(WorkflowState::Planning, context)?;

        match self
            .run_deploy(&preset, &credentials, &deployments, &mut machine)
            .await
        {
            Ok(record) => Ok(record),
            Err(e) => {
                let mut context = BTreeMap::new();
                context.insert("reason".to_string(), e.to_string());
                if let Err(transition_err) = machine.transition(WorkflowState::Error, context) {
                    // The deploy error is the one worth reporting; the failed
                    // bookkeeping transition is only logged.
                    tracing::warn!(
                        "could not record error state after deploy failure: {transition_err}"
                    );
                }
                Err(e)
            }
        }
    }

    async fn run_deploy(
        &self,
        preset: &Preset,
        credentials: &Credentials,
        deployments: &DeploymentStore,
        machine: &mut StateMachine,
    ) -> Result<DeploymentRecord> {
        machine.transition(WorkflowState::Provisioning, BTreeMap::new())?;

        if let Some(terraform_dir) = &preset.terraform_dir {
            self.run_terraform_up(terraform_dir).await?;
        }

        let provisioner = (self.provisioner_factory)(credentials, preset);
        let instance_id = provisioner
            .create(
                &preset.instance_type,
                &credentials.ssh_key_name,
                preset.name.as_str(),
                &preset.address_poll_policy(),
            )
            .await?;
        tracing::info!("launched instance {instance_id}");

        let instance = provisioner
            .wait_for_address(&instance_id, &preset.address_poll_policy())
            .await?;
        let address = instance.address.ok_or_else(|| {
            crate::provider::ProviderError::Malformed(
                "instance reported ready without an address".to_string(),
            )
        })?;
        tracing::info!("instance {instance_id} is reachable at {address}");

        // Record the deployment before bootstrapping so a failed bootstrap
        // still leaves an instance that `shutdown` can find and terminate.
        let record = DeploymentRecord {
            preset: preset.name.to_string(),
            instance_id: instance_id.clone(),
            address: address.clone(),
        };
        deployments.insert(record.clone())?;

        let mut context = BTreeMap::new();
        context.insert("instance".to_string(), instance_id.to_string());
        machine.transition(WorkflowState::Building, context)?;

        if let Some(build_context) = &preset.build_context {
            let runner = ProcessRunner;
            ImageBuilder::new(&runner)
                .build(preset, build_context, &[])
                .await?;
        }

        let mut context = BTreeMap::new();
        context.insert("address".to_string(), address.clone());
        machine.transition(WorkflowState::Deploying, context)?;

        self.bootstrap.run(preset, credentials, &address).await?;

        machine.transition(WorkflowState::Verifying, BTreeMap::new())?;

        let url = preset.health_url(&address);
        match probe(&url, &address, preset.health_timeout).await {
            StatusReport::Up { status, .. } => {
                tracing::info!("workload is healthy (status: {status})");
            }
            StatusReport::Down { reason, .. } => {
                // Containers can take minutes to begin serving; `status` is
                // the authoritative check, so a cold start is not a failure.
                tracing::warn!("workload at {address} is not answering yet ({reason})");
            }
            StatusReport::NotDeployed => unreachable!("probe never reports NotDeployed"),
        }

        let mut context = BTreeMap::new();
        context.insert("address".to_string(), address.clone());
        machine.transition(WorkflowState::Running, context)?;

        Ok(record)
    }

    /// Report whether a preset's workload is deployed and responding.
    pub async fn status(&self, preset_name: &str) -> Result<StatusReport> {
        let preset = Preset::load(&self.presets_dir, preset_name)?;

        let Some(record) = self.deployments().get(preset.name.as_str()) else {
            return Ok(StatusReport::NotDeployed);
        };

        let url = preset.health_url(&record.address);
        Ok(probe(&url, &record.address, preset.health_timeout).await)
    }

    /// Terminate a preset's instance and clear its deployment record.
    ///
    /// With no active deployment this is a no-op. The record is only removed
    /// after the provider confirms the instance is gone, so a failed delete
    /// can be retried.
    pub async fn shutdown(&self, preset_name: &str) -> Result<()> {
        let preset = Preset::load(&self.presets_dir, preset_name)?;

        let deployments = self.deployments();
        let Some(record) = deployments.get(preset.name.as_str()) else {
            tracing::info!("preset '{}' has no active deployment", preset.name);
            return Ok(());
        };

        let mut machine = self.machine_for(&preset);
        let mut context = BTreeMap::new();
        context.insert("instance".to_string(), record.instance_id.to_string());
        if let Err(e) = machine.transition(WorkflowState::Shutdown, context) {
            match e {
                WorkflowError::InvalidTransition { .. } => {
                    tracing::warn!("proceeding with shutdown anyway: {e}");
                }
                other => return Err(other.into()),
            }
        }

        let credentials = Credentials::resolve(&preset)?;

        if let Some(terraform_dir) = &preset.terraform_dir {
            let runner = ProcessRunner;
            Terraform::new(&runner, terraform_dir).destroy().await?;
        }

        let provisioner = (self.provisioner_factory)(&credentials, &preset);
        match provisioner.delete(&record.instance_id).await {
            Ok(()) => {}
            // Already gone on the provider side counts as success.
            Err(crate::provider::ProviderError::Api { status: 404, .. }) => {
                tracing::warn!(
                    "instance {} was already gone on the provider side",
                    record.instance_id
                );
            }
            Err(e) => return Err(e.into()),
        }
        tracing::info!("terminated instance {}", record.instance_id);

        deployments.remove(preset.name.as_str())?;
        machine.reset();
        Ok(())
    }

    async fn run_terraform_up(&self, terraform_dir: &Path) -> Result<()> {
        let runner = ProcessRunner;
        let terraform = Terraform::new(&runner, terraform_dir);
        terraform.init().await?;
        terraform.apply().await?;
        Ok(())
    }
}
