// ABOUTME: Preset definitions and YAML loading.
// ABOUTME: A preset describes one deployable workload: instance type, image, env, probes.

mod credentials;
mod env_value;

pub use credentials::{API_KEY_VAR, Credentials, SSH_KEY_NAME_VAR, SSH_PRIVATE_KEY_VAR};
pub use env_value::{EnvValue, expand, is_unresolved, resolve_env_map};

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::types::{ImageRef, PresetName};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default image namespace for locally built tags.
pub const DEFAULT_NAMESPACE: &str = "skylift";

/// Fixed interval between instance address polls.
const ADDRESS_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// A deployment preset loaded from `<presets-dir>/<name>.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct Preset {
    /// Set from the file stem after parsing, never from the YAML body.
    #[serde(skip, default = "default_preset_name")]
    pub name: PresetName,

    pub instance_type: String,

    #[serde(deserialize_with = "deserialize_image_ref")]
    pub image: ImageRef,

    pub port: u16,

    pub health_path: String,

    #[serde(default = "default_region")]
    pub region: String,

    #[serde(default)]
    pub env: BTreeMap<String, EnvValue>,

    /// Runtime secrets that must be exported before a deploy may start.
    #[serde(default)]
    pub required_env: Vec<String>,

    #[serde(default = "default_ssh_username")]
    pub ssh_username: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub ssh_key_name: Option<String>,

    #[serde(default)]
    pub ssh_private_key_path: Option<String>,

    /// Terraform working directory; when set, `init`/`apply` run before
    /// provisioning and `destroy` runs on shutdown.
    #[serde(default)]
    pub terraform_dir: Option<PathBuf>,

    /// Image build context; when set, the image is built locally during the
    /// building phase.
    #[serde(default)]
    pub build_context: Option<PathBuf>,

    #[serde(default)]
    pub image_namespace: Option<String>,

    #[serde(default = "default_address_timeout", with = "humantime_serde")]
    pub address_timeout: Duration,

    #[serde(default = "default_connect_retries")]
    pub connect_retries: u32,

    #[serde(default = "default_connect_delay", with = "humantime_serde")]
    pub connect_delay: Duration,

    #[serde(default = "default_health_timeout", with = "humantime_serde")]
    pub health_timeout: Duration,
}

fn default_preset_name() -> PresetName {
    PresetName::new("unnamed").expect("static name is valid")
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_ssh_username() -> String {
    "ubuntu".to_string()
}

fn default_address_timeout() -> Duration {
    Duration::from_secs(900)
}

fn default_connect_retries() -> u32 {
    20
}

fn default_connect_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_health_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Preset {
    pub fn from_yaml(name: &str, yaml: &str) -> Result<Self> {
        let name = PresetName::new(name).map_err(|e| Error::InvalidPreset(e.to_string()))?;
        let mut preset: Preset = serde_yaml::from_str(yaml)?;
        preset.name = name;
        Ok(preset)
    }

    /// Load a preset by name from the presets directory.
    /// Accepts both `.yaml` and `.yml` extensions.
    pub fn load(presets_dir: &Path, name: &str) -> Result<Self> {
        let candidates = [
            presets_dir.join(format!("{name}.yaml")),
            presets_dir.join(format!("{name}.yml")),
        ];

        for path in &candidates {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                return Self::from_yaml(name, &content);
            }
        }

        Err(Error::PresetNotFound {
            name: name.to_string(),
            dir: presets_dir.to_path_buf(),
        })
    }

    /// Retry policy for the instance address poll loop.
    pub fn address_poll_policy(&self) -> RetryPolicy {
        RetryPolicy::deadline(self.address_timeout, ADDRESS_POLL_INTERVAL)
    }

    /// Retry policy for the SSH connectivity loop.
    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy::attempts(self.connect_retries, self.connect_delay)
    }

    /// Health endpoint URL for a deployed instance address.
    pub fn health_url(&self, address: &str) -> String {
        format!("http://{}:{}{}", address, self.port, self.health_path)
    }

    /// Default image tag for local builds: `<namespace>/<preset>:latest`.
    pub fn default_build_tag(&self) -> String {
        let namespace = self.image_namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
        format!("{}/{}:latest", namespace, self.name)
    }
}

/// List the preset names available in a directory, sorted.
pub fn list_presets(presets_dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(presets_dir)? {
        let path = entry?.path();
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            names.push(stem.to_string());
        }
    }
    names.sort();
    Ok(names)
}

fn deserialize_image_ref<'de, D>(deserializer: D) -> std::result::Result<ImageRef, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageRef::parse(&s).map_err(serde::de::Error::custom)
}
