// ABOUTME: Terraform invocation wrapper for infrastructure provisioning.
// ABOUTME: Two-phase init/apply on deploy, destroy on shutdown, all auto-approved.

use std::path::PathBuf;
use thiserror::Error;

use super::{CommandExecutor, CommandOutput, ExecError};

/// A Terraform command failed. Preserves the captured streams of the
/// underlying execution for diagnostics.
#[derive(Debug, Error)]
#[error("terraform {action} failed: {source}")]
pub struct TerraformError {
    pub action: &'static str,
    #[source]
    pub source: ExecError,
}

/// Runs Terraform commands in a configured working directory.
pub struct Terraform<'a> {
    executor: &'a dyn CommandExecutor,
    workdir: PathBuf,
}

impl<'a> Terraform<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, workdir: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            workdir: workdir.into(),
        }
    }

    pub async fn init(&self) -> Result<CommandOutput, TerraformError> {
        self.run("init", &[]).await
    }

    pub async fn apply(&self) -> Result<CommandOutput, TerraformError> {
        self.run("apply", &["-auto-approve"]).await
    }

    pub async fn destroy(&self) -> Result<CommandOutput, TerraformError> {
        self.run("destroy", &["-auto-approve"]).await
    }

    async fn run(
        &self,
        action: &'static str,
        extra_args: &[&str],
    ) -> Result<CommandOutput, TerraformError> {
        let mut argv = vec!["terraform".to_string(), action.to_string()];
        argv.extend(extra_args.iter().map(|s| s.to_string()));

        tracing::info!("running terraform {} in {}", action, self.workdir.display());

        self.executor
            .run(&argv, &self.workdir)
            .await
            .map_err(|source| TerraformError { action, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::Mutex;

    struct RecordingExecutor {
        calls: Mutex<Vec<Vec<String>>>,
        fail: bool,
    }

    #[async_trait]
    impl CommandExecutor for RecordingExecutor {
        async fn run(&self, argv: &[String], _workdir: &Path) -> Result<CommandOutput, ExecError> {
            self.calls.lock().unwrap().push(argv.to_vec());
            if self.fail {
                return Err(ExecError::NonZeroExit {
                    argv: argv.to_vec(),
                    exit_code: 1,
                    stdout: String::new(),
                    stderr: "plan error".to_string(),
                });
            }
            Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn apply_and_destroy_are_auto_approved() {
        let executor = RecordingExecutor {
            calls: Mutex::new(Vec::new()),
            fail: false,
        };
        let terraform = Terraform::new(&executor, "/infra");

        terraform.init().await.unwrap();
        terraform.apply().await.unwrap();
        terraform.destroy().await.unwrap();

        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls[0], ["terraform", "init"]);
        assert_eq!(calls[1], ["terraform", "apply", "-auto-approve"]);
        assert_eq!(calls[2], ["terraform", "destroy", "-auto-approve"]);
    }

    #[tokio::test]
    async fn failure_preserves_captured_streams() {
        let executor = RecordingExecutor {
            calls: Mutex::new(Vec::new()),
            fail: true,
        };
        let terraform = Terraform::new(&executor, "/infra");

        let err = terraform.apply().await.unwrap_err();
        assert_eq!(err.action, "apply");
        assert_eq!(err.source.stderr(), Some("plan error"));
    }
}
