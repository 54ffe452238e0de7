// ABOUTME: HTTP transport for the cloud provider API.
// ABOUTME: Bearer-token auth, fixed client header, per-request timeout.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

use super::error::{ProviderError, Result};

/// Identifying client header sent with every provider request.
pub const USER_AGENT: &str = concat!("skylift/", env!("CARGO_PKG_VERSION"));

/// Default provider API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://cloud.lambdalabs.com/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Transport seam for provider calls, so tests substitute deterministic
/// fakes without touching the network.
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value>;
}

/// Production transport over HTTPS.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client construction cannot fail with static options");

        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn request(&self, method: Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("provider request {} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.api_key);

        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            // Delete responses may carry no body.
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ProviderError::Malformed(format!("invalid JSON body: {e}")))
    }
}
