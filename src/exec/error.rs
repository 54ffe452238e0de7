// ABOUTME: Error types for local command execution.
// ABOUTME: Nonzero exits carry the full captured output for diagnostics.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command `{}` exited with status {exit_code}", argv.join(" "))]
    NonZeroExit {
        argv: Vec<String>,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// Captured stderr, when the command ran at all.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ExecError::NonZeroExit { stderr, .. } => Some(stderr),
            ExecError::Spawn { .. } => None,
        }
    }
}
