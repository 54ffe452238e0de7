// ABOUTME: Durable record of which instance serves each preset.
// ABOUTME: Single JSON map file keyed by preset name, written atomically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::InstanceId;

/// An active deployment: one provisioned instance serving one preset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRecord {
    pub preset: String,
    pub instance_id: InstanceId,
    pub address: String,
}

/// File-backed map of preset name to deployment record.
#[derive(Debug, Clone)]
pub struct DeploymentStore {
    path: PathBuf,
}

impl DeploymentStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, preset: &str) -> Option<DeploymentRecord> {
        self.load_all().remove(preset)
    }

    pub fn insert(&self, record: DeploymentRecord) -> std::io::Result<()> {
        let mut all = self.load_all();
        all.insert(record.preset.clone(), record);
        self.save_all(&all)
    }

    pub fn remove(&self, preset: &str) -> std::io::Result<()> {
        let mut all = self.load_all();
        if all.remove(preset).is_some() {
            self.save_all(&all)?;
        }
        Ok(())
    }

    /// Load the full map. A missing or unparsable file yields an empty map
    /// with a warning rather than failing the operation.
    fn load_all(&self) -> BTreeMap<String, DeploymentRecord> {
        if !self.path.exists() {
            return BTreeMap::new();
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(
                    "unable to read deployments file {}: {}",
                    self.path.display(),
                    e
                );
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "unable to parse deployments file {}: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    fn save_all(&self, all: &BTreeMap<String, DeploymentRecord>) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(all)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &self.path)
    }
}
