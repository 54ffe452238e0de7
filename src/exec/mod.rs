// ABOUTME: Local command execution with captured output.
// ABOUTME: A nonzero exit is always an error, never a soft return value.

mod error;
mod image;
mod terraform;

pub use error::ExecError;
pub use image::{ImageBuildError, ImageBuilder};
pub use terraform::{Terraform, TerraformError};

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Captured result of a completed local command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Executes an external command in a working directory.
///
/// The seam exists so tests can substitute deterministic fakes for the
/// infrastructure and image-build tools.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(&self, argv: &[String], workdir: &Path) -> Result<CommandOutput, ExecError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandExecutor for ProcessRunner {
    async fn run(&self, argv: &[String], workdir: &Path) -> Result<CommandOutput, ExecError> {
        let (program, args) = argv.split_first().ok_or_else(|| ExecError::Spawn {
            program: String::new(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
        })?;

        tracing::debug!("running `{}` in {}", argv.join(" "), workdir.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(workdir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExecError::Spawn {
                program: program.clone(),
                source: e,
            })?;

        let result = CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.exit_code != 0 {
            return Err(ExecError::NonZeroExit {
                argv: argv.to_vec(),
                exit_code: result.exit_code,
                stdout: result.stdout,
                stderr: result.stderr,
            });
        }

        Ok(result)
    }
}
