// ABOUTME: Workflow phase tracking with a validated transition table.
// ABOUTME: Exports the state machine, persistence store, and observer seam.

mod error;
mod machine;
mod state;
mod store;

pub use error::WorkflowError;
pub use machine::{StateMachine, TransitionRecord, WorkflowEvent, WorkflowObserver};
pub use state::{TransitionTable, WorkflowState};
pub use store::{StateStore, WorkflowRecord};
