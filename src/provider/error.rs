// ABOUTME: Error types for the cloud provider API client.
// ABOUTME: Distinguishes HTTP, transport, malformed-response, and timeout failures.

use thiserror::Error;

use crate::types::{InstanceId, OperationId};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a non-success status.
    #[error("provider API error {status}: {body}")]
    Api { status: u16, body: String },

    /// The provider could not be reached at the transport level.
    #[error("unable to reach provider API: {0}")]
    Unreachable(String),

    /// The provider answered but the response was unusable, for example an
    /// acknowledged launch with no instance identifiers. Hard error, never a
    /// retry condition.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The instance never received an address within the wait budget.
    #[error("timed out waiting for instance {instance} to get an address (last status: {last_status})")]
    AddressTimeout {
        instance: InstanceId,
        last_status: String,
    },

    /// A launch operation never populated its resources within the wait budget.
    #[error("timed out waiting for operation {operation} (last status: {last_status})")]
    OperationTimeout {
        operation: OperationId,
        last_status: String,
    },
}

pub type Result<T> = std::result::Result<T, ProviderError>;
