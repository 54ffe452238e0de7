// ABOUTME: Cloud provider client for GPU instance lifecycle.
// ABOUTME: Create with operation-handle resolution, get, delete, bounded address wait.

use reqwest::Method;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Instant;

use crate::retry::RetryPolicy;
use crate::types::{InstanceId, OperationId};

use super::error::{ProviderError, Result};
use super::transport::ProviderTransport;

/// A provisioned compute instance as reported by the provider.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: InstanceId,
    /// Absent until the provider assigns a routable address.
    pub address: Option<String>,
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct InstanceWire {
    id: Option<String>,
    ip: Option<String>,
    status: Option<String>,
}

impl InstanceWire {
    fn into_instance(self, fallback_id: &InstanceId) -> Instance {
        Instance {
            id: self
                .id
                .map(InstanceId::new)
                .unwrap_or_else(|| fallback_id.clone()),
            address: self.ip.filter(|ip| !ip.is_empty()),
            status: self.status.unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OperationWire {
    status: Option<String>,
    #[serde(default)]
    instance_ids: Vec<String>,
}

/// Client for the cloud compute API.
pub struct Provisioner {
    transport: Box<dyn ProviderTransport>,
    region: String,
}

impl Provisioner {
    pub fn new(transport: Box<dyn ProviderTransport>, region: impl Into<String>) -> Self {
        Self {
            transport,
            region: region.into(),
        }
    }

    /// Launch an instance and return its identifier.
    ///
    /// Providers may acknowledge the launch asynchronously with an operation
    /// handle instead of instance identifiers; in that case the operation
    /// endpoint is polled under `operation_policy` until identifiers appear.
    pub async fn create(
        &self,
        instance_type: &str,
        ssh_key_name: &str,
        name: &str,
        operation_policy: &RetryPolicy,
    ) -> Result<InstanceId> {
        let payload = json!({
            "region_name": self.region,
            "instance_type_name": instance_type,
            "quantity": 1,
            "name": name,
            "ssh_key_names": [ssh_key_name],
        });

        let response = self
            .transport
            .request(Method::POST, "/instances", Some(payload))
            .await?;
        let data = &response["data"];

        // Synchronous acknowledgement: instance identifiers in the response.
        if let Some(id) = first_instance_id(data) {
            return Ok(id);
        }

        // Asynchronous acknowledgement: an operation handle to poll.
        if let Some(op) = data["operation"]["id"]
            .as_str()
            .or_else(|| data["operation_id"].as_str())
        {
            let operation = OperationId::new(op);
            return self.wait_for_operation(&operation, operation_policy).await;
        }

        Err(ProviderError::Malformed(
            "instance launch acknowledged but no instance identifiers returned".to_string(),
        ))
    }

    /// Fetch the current state of an instance.
    pub async fn get(&self, id: &InstanceId) -> Result<Instance> {
        let response = self
            .transport
            .request(Method::GET, &format!("/instances/{id}"), None)
            .await?;

        let wire: InstanceWire = serde_json::from_value(response["data"].clone())
            .map_err(|e| ProviderError::Malformed(format!("instance record: {e}")))?;
        Ok(wire.into_instance(id))
    }

    /// Terminate an instance. A provider-side 404 is surfaced as-is; the
    /// orchestrator decides whether an already-gone instance counts as
    /// success.
    pub async fn delete(&self, id: &InstanceId) -> Result<()> {
        self.transport
            .request(Method::DELETE, &format!("/instances/{id}"), None)
            .await?;
        Ok(())
    }

    /// Poll `get` on the policy's fixed interval until the instance has an
    /// address. Never returns an address-less instance: exceeding the budget
    /// fails with a timeout error carrying the last observed status.
    pub async fn wait_for_address(
        &self,
        id: &InstanceId,
        policy: &RetryPolicy,
    ) -> Result<Instance> {
        let started = Instant::now();
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let instance = self.get(id).await?;

            if instance.address.is_some() {
                return Ok(instance);
            }

            let last_status = instance.status;
            tracing::debug!(
                "instance {} has no address yet (status: {})",
                id,
                last_status
            );

            if policy.exhausted(attempts, started.elapsed()) {
                return Err(ProviderError::AddressTimeout {
                    instance: id.clone(),
                    last_status,
                });
            }
            tokio::time::sleep(policy.delay).await;
            if policy.exhausted(attempts, started.elapsed()) {
                return Err(ProviderError::AddressTimeout {
                    instance: id.clone(),
                    last_status,
                });
            }
        }
    }

    async fn wait_for_operation(
        &self,
        operation: &OperationId,
        policy: &RetryPolicy,
    ) -> Result<InstanceId> {
        let started = Instant::now();
        let mut attempts = 0u32;
        let mut last_status = "pending".to_string();

        loop {
            attempts += 1;
            let response = self
                .transport
                .request(Method::GET, &format!("/operations/{operation}"), None)
                .await?;

            let wire: OperationWire = serde_json::from_value(response["data"].clone())
                .map_err(|e| ProviderError::Malformed(format!("operation record: {e}")))?;

            if let Some(id) = wire.instance_ids.first() {
                return Ok(InstanceId::new(id.clone()));
            }
            if let Some(status) = wire.status {
                last_status = status;
            }

            if policy.exhausted(attempts, started.elapsed()) {
                return Err(ProviderError::OperationTimeout {
                    operation: operation.clone(),
                    last_status,
                });
            }
            tokio::time::sleep(policy.delay).await;
        }
    }
}

fn first_instance_id(data: &Value) -> Option<InstanceId> {
    if let Some(id) = data["instances"][0]["id"].as_str() {
        return Some(InstanceId::new(id));
    }
    if let Some(id) = data["instance_ids"][0].as_str() {
        return Some(InstanceId::new(id));
    }
    None
}
