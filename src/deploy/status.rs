// ABOUTME: Health probing of a deployed workload over HTTP.
// ABOUTME: Distinguishes "no deployment", "responding", and "deployed but down".

use serde::Deserialize;
use std::time::{Duration, Instant};

/// Outcome of a status check for one preset.
#[derive(Debug, Clone)]
pub enum StatusReport {
    /// No deployment record exists.
    NotDeployed,
    /// The workload answered its health endpoint.
    Up {
        address: String,
        status: String,
        latency_ms: u64,
    },
    /// A deployment record exists but the workload did not answer.
    Down { address: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    status: Option<String>,
}

/// Probe a health endpoint, mapping every failure mode to [`StatusReport::Down`]
/// rather than an error: an unreachable workload is a result, not a fault.
pub async fn probe(url: &str, address: &str, timeout: Duration) -> StatusReport {
    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(client) => client,
        Err(e) => {
            return StatusReport::Down {
                address: address.to_string(),
                reason: format!("probe client: {e}"),
            };
        }
    };

    let started = Instant::now();
    let response = match client.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            return StatusReport::Down {
                address: address.to_string(),
                reason: e.to_string(),
            };
        }
    };
    let latency_ms = started.elapsed().as_millis() as u64;

    if !response.status().is_success() {
        return StatusReport::Down {
            address: address.to_string(),
            reason: format!("health endpoint returned {}", response.status()),
        };
    }

    let status = match response.json::<HealthBody>().await {
        Ok(body) => body.status.unwrap_or_else(|| "ok".to_string()),
        Err(_) => "ok".to_string(),
    };

    StatusReport::Up {
        address: address.to_string(),
        status,
        latency_ms,
    }
}
