// ABOUTME: Finite-state workflow tracker with persisted append-only history.
// ABOUTME: Every successful mutation is written to the state store before returning.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::WorkflowError;
use super::state::{TransitionTable, WorkflowState};
use super::store::{StateStore, WorkflowRecord};

/// One applied state transition. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub timestamp: DateTime<Utc>,
    /// `None` for reset records.
    pub from: Option<WorkflowState>,
    pub to: WorkflowState,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl TransitionRecord {
    pub fn new(
        from: Option<WorkflowState>,
        to: WorkflowState,
        context: BTreeMap<String, String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            from,
            to,
            context,
        }
    }
}

/// Event delivered to a [`WorkflowObserver`] after a mutation is persisted.
#[derive(Debug, Clone, Copy)]
pub enum WorkflowEvent<'a> {
    Transition(&'a TransitionRecord),
    Reset(&'a TransitionRecord),
}

/// Observer invoked synchronously after each transition or reset.
///
/// Contract: observers are for downstream logging only; they must not block
/// and cannot fail the mutation that triggered them.
pub trait WorkflowObserver: Send + Sync {
    fn on_event(&self, event: WorkflowEvent<'_>);
}

/// Explicit state-transition tracker with a validated table and durable history.
pub struct StateMachine {
    initial_state: WorkflowState,
    current_state: WorkflowState,
    table: TransitionTable,
    history: Vec<TransitionRecord>,
    store: StateStore,
    observer: Option<Box<dyn WorkflowObserver>>,
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateMachine")
            .field("current_state", &self.current_state)
            .field("history_len", &self.history.len())
            .field("store", &self.store.path())
            .finish()
    }
}

impl StateMachine {
    /// Construct the machine, reloading persisted state when present.
    /// A missing or corrupt record falls back to the supplied defaults.
    pub fn load(store: StateStore, initial_state: WorkflowState, table: TransitionTable) -> Self {
        match store.load() {
            Some(record) => Self {
                initial_state: record.initial_state,
                current_state: record.current_state,
                table: record.transitions,
                history: record.history,
                store,
                observer: None,
            },
            None => Self {
                initial_state,
                current_state: initial_state,
                table,
                history: Vec::new(),
                store,
                observer: None,
            },
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn WorkflowObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn current_state(&self) -> WorkflowState {
        self.current_state
    }

    /// Read-only snapshot of the transition history, oldest first.
    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Apply a transition to `target`.
    ///
    /// Fails with [`WorkflowError::InvalidTransition`] when `target` is not
    /// reachable from the current state; on failure neither the current state
    /// nor the history changes.
    pub fn transition(
        &mut self,
        target: WorkflowState,
        context: BTreeMap<String, String>,
    ) -> Result<&TransitionRecord, WorkflowError> {
        if !self.table.allows(self.current_state, target) {
            tracing::error!("invalid transition {} -> {}", self.current_state, target);
            return Err(WorkflowError::InvalidTransition {
                from: self.current_state,
                to: target,
            });
        }

        let from = self.current_state;
        let record = TransitionRecord::new(Some(from), target, context);
        self.history.push(record);
        self.current_state = target;
        self.persist();

        let record = self.history.last().expect("record just pushed");
        tracing::info!("transitioned from {} to {}", from, record.to);
        self.notify(WorkflowEvent::Transition(record));
        Ok(self.history.last().expect("record just pushed"))
    }

    /// Force the machine back to its initial state, recording the reset with
    /// a null source and a marker context.
    pub fn reset(&mut self) -> &TransitionRecord {
        let mut context = BTreeMap::new();
        context.insert("reset".to_string(), "true".to_string());

        self.current_state = self.initial_state;
        self.history
            .push(TransitionRecord::new(None, self.initial_state, context));
        self.persist();

        let record = self.history.last().expect("record just pushed");
        tracing::info!("state machine reset to {}", self.initial_state);
        self.notify(WorkflowEvent::Reset(record));
        self.history.last().expect("record just pushed")
    }

    fn persist(&self) {
        let record = WorkflowRecord {
            initial_state: self.initial_state,
            current_state: self.current_state,
            transitions: self.table.clone(),
            history: self.history.clone(),
        };
        if let Err(e) = self.store.save(&record) {
            tracing::error!(
                "failed to persist state to {}: {}",
                self.store.path().display(),
                e
            );
        }
    }

    fn notify(&self, event: WorkflowEvent<'_>) {
        if let Some(observer) = &self.observer {
            observer.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn machine(dir: &std::path::Path) -> StateMachine {
        StateMachine::load(
            StateStore::new(dir.join("workflow.json")),
            WorkflowState::Idle,
            TransitionTable::default(),
        )
    }

    #[test]
    fn valid_transition_updates_state_and_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        let record = machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();
        assert_eq!(record.from, Some(WorkflowState::Idle));
        assert_eq!(record.to, WorkflowState::Provisioning);

        assert_eq!(machine.current_state(), WorkflowState::Provisioning);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn invalid_transition_leaves_state_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();

        let err = machine
            .transition(WorkflowState::Running, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: WorkflowState::Provisioning,
                to: WorkflowState::Running,
            }
        ));

        assert_eq!(machine.current_state(), WorkflowState::Provisioning);
        assert_eq!(machine.history().len(), 1);
    }

    #[test]
    fn current_state_matches_last_history_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        machine
            .transition(WorkflowState::Planning, BTreeMap::new())
            .unwrap();
        machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();

        let last = machine.history().last().unwrap();
        assert_eq!(machine.current_state(), last.to);
    }

    #[test]
    fn persists_after_each_transition() {
        let dir = tempfile::tempdir().unwrap();

        {
            let mut machine = machine(dir.path());
            machine
                .transition(WorkflowState::Planning, BTreeMap::new())
                .unwrap();
            machine
                .transition(WorkflowState::Provisioning, BTreeMap::new())
                .unwrap();
        }

        // A fresh machine reloads the persisted record verbatim.
        let machine = machine(dir.path());
        assert_eq!(machine.current_state(), WorkflowState::Provisioning);
        assert_eq!(machine.history().len(), 2);
    }

    #[test]
    fn corrupt_store_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("workflow.json"), "garbage").unwrap();

        let machine = machine(dir.path());
        assert_eq!(machine.current_state(), WorkflowState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn reset_records_null_source_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();
        let record = machine.reset();

        assert_eq!(record.from, None);
        assert_eq!(record.to, WorkflowState::Idle);
        assert_eq!(record.context.get("reset"), Some(&"true".to_string()));
        assert_eq!(machine.current_state(), WorkflowState::Idle);
    }

    struct RecordingObserver(Mutex<Vec<String>>);

    impl WorkflowObserver for RecordingObserver {
        fn on_event(&self, event: WorkflowEvent<'_>) {
            let entry = match event {
                WorkflowEvent::Transition(r) => format!("transition:{}", r.to),
                WorkflowEvent::Reset(r) => format!("reset:{}", r.to),
            };
            self.0.lock().unwrap().push(entry);
        }
    }

    #[test]
    fn observer_sees_transitions_and_resets() {
        let dir = tempfile::tempdir().unwrap();
        let observer = Box::leak(Box::new(RecordingObserver(Mutex::new(Vec::new()))));

        let mut machine = StateMachine::load(
            StateStore::new(dir.path().join("workflow.json")),
            WorkflowState::Idle,
            TransitionTable::default(),
        )
        .with_observer(Box::new(ObserverRef(observer)));

        machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();
        machine.reset();

        let events = observer.0.lock().unwrap();
        assert_eq!(
            events.as_slice(),
            ["transition:provisioning", "reset:idle"]
        );
    }

    struct ObserverRef(&'static RecordingObserver);

    impl WorkflowObserver for ObserverRef {
        fn on_event(&self, event: WorkflowEvent<'_>) {
            self.0.on_event(event);
        }
    }
}
