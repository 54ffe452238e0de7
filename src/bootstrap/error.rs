// ABOUTME: Error types for remote instance bootstrap.
// ABOUTME: Connectivity exhaustion is fatal for the deploy attempt; the instance stays up.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    /// SSH never became reachable within the retry budget.
    #[error("SSH unreachable after {attempts} attempts: {last_error}")]
    ConnectivityExhausted { attempts: u32, last_error: String },

    /// A setup step exited nonzero after connectivity was established.
    /// No partial-step retry; the instance remains created and billable.
    #[error("bootstrap step '{step}' failed with exit code {exit_code}: {diagnostic}")]
    StepFailed {
        step: &'static str,
        exit_code: u32,
        diagnostic: String,
    },

    /// The shell channel itself failed while running a step.
    #[error("remote shell error during step '{step}': {source}")]
    Shell {
        step: &'static str,
        #[source]
        source: crate::ssh::Error,
    },

    /// Configuration problems caught before any remote command runs,
    /// such as unresolved environment placeholders.
    #[error(transparent)]
    Config(#[from] crate::error::Error),
}
