// ABOUTME: Workflow phases and the validated transition table.
// ABOUTME: States are a closed enum; table overrides are checked against it at load.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use super::error::WorkflowError;

/// Phases of a deployment workflow. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Idle,
    Planning,
    Provisioning,
    Building,
    Deploying,
    Verifying,
    Running,
    Updating,
    Shutdown,
    Error,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Planning => "planning",
            WorkflowState::Provisioning => "provisioning",
            WorkflowState::Building => "building",
            WorkflowState::Deploying => "deploying",
            WorkflowState::Verifying => "verifying",
            WorkflowState::Running => "running",
            WorkflowState::Updating => "updating",
            WorkflowState::Shutdown => "shutdown",
            WorkflowState::Error => "error",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowState {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(WorkflowState::Idle),
            "planning" => Ok(WorkflowState::Planning),
            "provisioning" => Ok(WorkflowState::Provisioning),
            "building" => Ok(WorkflowState::Building),
            "deploying" => Ok(WorkflowState::Deploying),
            "verifying" => Ok(WorkflowState::Verifying),
            "running" => Ok(WorkflowState::Running),
            "updating" => Ok(WorkflowState::Updating),
            "shutdown" => Ok(WorkflowState::Shutdown),
            "error" => Ok(WorkflowState::Error),
            other => Err(WorkflowError::UnknownState(other.to_string())),
        }
    }
}

/// Mapping from each state to the set of states directly reachable from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransitionTable(BTreeMap<WorkflowState, BTreeSet<WorkflowState>>);

impl Default for TransitionTable {
    fn default() -> Self {
        use WorkflowState::*;
        let entries: [(WorkflowState, &[WorkflowState]); 10] = [
            (Idle, &[Planning, Provisioning]),
            (Planning, &[Provisioning, Error]),
            (Provisioning, &[Building, Error]),
            (Building, &[Deploying, Error]),
            (Deploying, &[Verifying, Running, Error]),
            (Verifying, &[Running, Error]),
            (Running, &[Updating, Shutdown, Error]),
            (Updating, &[Verifying, Running, Error]),
            (Shutdown, &[Idle]),
            (Error, &[Idle]),
        ];
        Self(
            entries
                .into_iter()
                .map(|(from, to)| (from, to.iter().copied().collect()))
                .collect(),
        )
    }
}

impl TransitionTable {
    /// Build a table from the default, overriding entries from a mapping of
    /// state names. Unknown state names on either side are rejected.
    pub fn with_overrides(
        overrides: &BTreeMap<String, Vec<String>>,
    ) -> Result<Self, WorkflowError> {
        let mut table = Self::default();
        for (from, targets) in overrides {
            let from: WorkflowState = from.parse()?;
            let targets = targets
                .iter()
                .map(|t| t.parse())
                .collect::<Result<BTreeSet<_>, _>>()?;
            table.0.insert(from, targets);
        }
        Ok(table)
    }

    pub fn allows(&self, from: WorkflowState, to: WorkflowState) -> bool {
        self.0.get(&from).is_some_and(|targets| targets.contains(&to))
    }

    pub fn targets(&self, from: WorkflowState) -> impl Iterator<Item = WorkflowState> + '_ {
        self.0.get(&from).into_iter().flatten().copied()
    }
}
