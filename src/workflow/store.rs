// ABOUTME: Durable JSON persistence for the workflow record.
// ABOUTME: Missing or corrupt records load as "no prior state", never as an error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::machine::TransitionRecord;
use super::state::{TransitionTable, WorkflowState};

/// The full persisted workflow: everything needed to reload the tracker
/// verbatim across process restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRecord {
    pub initial_state: WorkflowState,
    pub current_state: WorkflowState,
    pub transitions: TransitionTable,
    pub history: Vec<TransitionRecord>,
}

/// File-backed store for a [`WorkflowRecord`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted record. Absent or unparsable files yield `None`
    /// with a warning; the caller falls back to its defaults.
    pub fn load(&self) -> Option<WorkflowRecord> {
        if !self.path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("unable to read state file {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("unable to parse state file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist the record. Writes a sibling temp file then renames it so a
    /// crash mid-write never leaves a truncated record behind.
    pub fn save(&self, record: &WorkflowRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_string_pretty(record)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)?;
        std::fs::rename(&tmp, &self.path)
    }
}
