// ABOUTME: Integration tests for the workflow state machine.
// ABOUTME: Covers the transition table, persistence, overrides, and observers.

use skylift::workflow::{
    StateMachine, StateStore, TransitionTable, WorkflowError, WorkflowEvent, WorkflowObserver,
    WorkflowState,
};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

fn machine(dir: &Path) -> StateMachine {
    StateMachine::load(
        StateStore::new(dir.join("workflow.json")),
        WorkflowState::Idle,
        TransitionTable::default(),
    )
}

fn ctx(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

mod transitions {
    use super::*;

    #[test]
    fn full_deploy_lifecycle_is_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        for target in [
            WorkflowState::Planning,
            WorkflowState::Provisioning,
            WorkflowState::Building,
            WorkflowState::Deploying,
            WorkflowState::Verifying,
            WorkflowState::Running,
            WorkflowState::Shutdown,
            WorkflowState::Idle,
        ] {
            machine.transition(target, BTreeMap::new()).unwrap();
        }
        assert_eq!(machine.current_state(), WorkflowState::Idle);
        assert_eq!(machine.history().len(), 8);
    }

    #[test]
    fn provisioning_cannot_jump_straight_to_running() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        machine
            .transition(WorkflowState::Provisioning, BTreeMap::new())
            .unwrap();
        assert_eq!(machine.current_state(), WorkflowState::Provisioning);
        assert_eq!(machine.history().len(), 1);

        let err = machine
            .transition(WorkflowState::Running, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidTransition { .. }));
        assert_eq!(machine.current_state(), WorkflowState::Provisioning);
    }

    #[test]
    fn invalid_transition_changes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        let err = machine
            .transition(WorkflowState::Running, BTreeMap::new())
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::InvalidTransition {
                from: WorkflowState::Idle,
                to: WorkflowState::Running,
            }
        ));
        assert_eq!(machine.current_state(), WorkflowState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn error_is_reachable_from_every_active_phase() {
        let table = TransitionTable::default();
        for from in [
            WorkflowState::Planning,
            WorkflowState::Provisioning,
            WorkflowState::Building,
            WorkflowState::Deploying,
            WorkflowState::Verifying,
        ] {
            assert!(table.allows(from, WorkflowState::Error), "{from} -> error");
        }
    }

    #[test]
    fn error_recovers_only_to_idle() {
        let table = TransitionTable::default();
        let targets: Vec<_> = table.targets(WorkflowState::Error).collect();
        assert_eq!(targets, vec![WorkflowState::Idle]);
    }

    #[test]
    fn update_cycle_returns_through_verification() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        for target in [
            WorkflowState::Planning,
            WorkflowState::Provisioning,
            WorkflowState::Building,
            WorkflowState::Deploying,
            WorkflowState::Running,
            WorkflowState::Updating,
            WorkflowState::Verifying,
            WorkflowState::Running,
        ] {
            machine.transition(target, BTreeMap::new()).unwrap();
        }
        assert_eq!(machine.current_state(), WorkflowState::Running);
    }

    #[test]
    fn context_is_recorded_with_the_transition() {
        let dir = tempfile::tempdir().unwrap();
        let mut machine = machine(dir.path());

        machine
            .transition(WorkflowState::Planning, ctx(&[("preset", "image-server")]))
            .unwrap();
        let record = machine.history().last().unwrap();
        assert_eq!(record.context.get("preset").unwrap(), "image-server");
    }
}

mod overrides {
    use super::*;

    #[test]
    fn overrides_replace_rows_and_keep_the_rest() {
        let mut overrides = BTreeMap::new();
        overrides.insert("idle".to_string(), vec!["error".to_string()]);
        let table = TransitionTable::with_overrides(&overrides).unwrap();

        assert!(table.allows(WorkflowState::Idle, WorkflowState::Error));
        assert!(!table.allows(WorkflowState::Idle, WorkflowState::Planning));
        // Untouched rows keep their defaults.
        assert!(table.allows(WorkflowState::Running, WorkflowState::Shutdown));
    }

    #[test]
    fn unknown_state_names_are_rejected() {
        let mut overrides = BTreeMap::new();
        overrides.insert("idle".to_string(), vec!["exploded".to_string()]);
        let err = TransitionTable::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownState(name) if name == "exploded"));
    }
}

mod persistence {
    use super::*;

    #[test]
    fn state_survives_a_reload() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = machine(dir.path());
        first
            .transition(WorkflowState::Planning, BTreeMap::new())
            .unwrap();
        first
            .transition(WorkflowState::Provisioning, ctx(&[("instance", "inst-1")]))
            .unwrap();
        drop(first);

        let reloaded = machine(dir.path());
        assert_eq!(reloaded.current_state(), WorkflowState::Provisioning);
        assert_eq!(reloaded.history().len(), 2);
        assert_eq!(
            reloaded.history()[1].context.get("instance").unwrap(),
            "inst-1"
        );
    }

    #[test]
    fn corrupt_state_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("workflow.json"), "][ not json").unwrap();

        let machine = machine(dir.path());
        assert_eq!(machine.current_state(), WorkflowState::Idle);
        assert!(machine.history().is_empty());
    }

    #[test]
    fn reset_returns_to_initial_and_is_persisted() {
        let dir = tempfile::tempdir().unwrap();

        let mut machine = super::machine(dir.path());
        machine
            .transition(WorkflowState::Planning, BTreeMap::new())
            .unwrap();
        machine.reset();
        assert_eq!(machine.current_state(), WorkflowState::Idle);
        drop(machine);

        let reloaded = super::machine(dir.path());
        assert_eq!(reloaded.current_state(), WorkflowState::Idle);
        let last = reloaded.history().last().unwrap();
        assert_eq!(last.from, None);
        assert_eq!(last.context.get("reset").unwrap(), "true");
    }
}

mod observers {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl WorkflowObserver for &'static Recorder {
        fn on_event(&self, event: WorkflowEvent<'_>) {
            let label = match event {
                WorkflowEvent::Transition(record) => format!("-> {}", record.to),
                WorkflowEvent::Reset(record) => format!("reset {}", record.to),
            };
            self.events.lock().unwrap().push(label);
        }
    }

    #[test]
    fn observer_sees_transitions_and_resets_in_order() {
        let recorder: &'static Recorder = Box::leak(Box::new(Recorder::default()));
        let dir = tempfile::tempdir().unwrap();

        let mut machine = StateMachine::load(
            StateStore::new(dir.path().join("workflow.json")),
            WorkflowState::Idle,
            TransitionTable::default(),
        )
        .with_observer(Box::new(recorder));

        machine
            .transition(WorkflowState::Planning, BTreeMap::new())
            .unwrap();
        machine
            .transition(WorkflowState::Error, BTreeMap::new())
            .unwrap();
        machine.reset();

        let events = recorder.events.lock().unwrap();
        assert_eq!(*events, vec!["-> planning", "-> error", "reset idle"]);
    }

    #[test]
    fn observer_is_not_called_for_rejected_transitions() {
        let recorder: &'static Recorder = Box::leak(Box::new(Recorder::default()));
        let dir = tempfile::tempdir().unwrap();

        let mut machine = StateMachine::load(
            StateStore::new(dir.path().join("workflow.json")),
            WorkflowState::Idle,
            TransitionTable::default(),
        )
        .with_observer(Box::new(recorder));

        let _ = machine.transition(WorkflowState::Running, BTreeMap::new());
        assert!(recorder.events.lock().unwrap().is_empty());
    }
}
