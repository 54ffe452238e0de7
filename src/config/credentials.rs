// ABOUTME: Provider and SSH credentials resolved from preset values or environment.
// ABOUTME: All three credentials are required before any provider call is made.

use crate::error::{Error, Result};
use std::path::PathBuf;

use super::Preset;
use super::env_value::expand;

/// Environment variable holding the provider API key.
pub const API_KEY_VAR: &str = "SKYLIFT_API_KEY";
/// Environment variable holding the provider-side SSH key name.
pub const SSH_KEY_NAME_VAR: &str = "SKYLIFT_SSH_KEY_NAME";
/// Environment variable holding the path to the SSH private key.
pub const SSH_PRIVATE_KEY_VAR: &str = "SSH_PRIVATE_KEY";

/// Credentials needed to provision an instance and reach it over SSH.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api_key: String,
    pub ssh_key_name: String,
    pub ssh_private_key_path: PathBuf,
}

impl Credentials {
    /// Resolve credentials from the preset, falling back to the environment.
    /// Preset values are expanded so they may reference `${VAR}` or `~`.
    pub fn resolve(preset: &Preset) -> Result<Self> {
        let api_key = Self::from_preset_or_env(preset.api_key.as_deref(), API_KEY_VAR)?;
        let ssh_key_name =
            Self::from_preset_or_env(preset.ssh_key_name.as_deref(), SSH_KEY_NAME_VAR)?;
        let ssh_private_key_path = Self::from_preset_or_env(
            preset.ssh_private_key_path.as_deref(),
            SSH_PRIVATE_KEY_VAR,
        )?;

        Ok(Self {
            api_key,
            ssh_key_name,
            ssh_private_key_path: PathBuf::from(ssh_private_key_path),
        })
    }

    fn from_preset_or_env(preset_value: Option<&str>, var: &str) -> Result<String> {
        if let Some(value) = preset_value {
            let expanded = expand(value);
            if !expanded.is_empty() {
                return Ok(expanded);
            }
        }
        match std::env::var(var) {
            Ok(value) if !value.is_empty() => Ok(expand(&value)),
            _ => Err(Error::MissingEnvVar(var.to_string())),
        }
    }
}
