// ABOUTME: Error types for workflow state tracking.
// ABOUTME: Invalid transitions are workflow-logic errors and are never retried.

use thiserror::Error;

use super::state::WorkflowState;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid transition from '{from}' to '{to}'")]
    InvalidTransition {
        from: WorkflowState,
        to: WorkflowState,
    },

    #[error("unknown workflow state: '{0}'")]
    UnknownState(String),
}
