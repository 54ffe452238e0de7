// ABOUTME: Client for the cloud compute provider API.
// ABOUTME: Exports the transport seam, the provisioner, and instance types.

mod client;
mod error;
mod transport;

pub use client::{Instance, Provisioner};
pub use error::ProviderError;
pub use transport::{DEFAULT_BASE_URL, HttpTransport, ProviderTransport, USER_AGENT};
