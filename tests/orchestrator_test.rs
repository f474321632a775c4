//! Integration tests for the wipe sequence against in-process fakes.

use std::sync::Arc;

use mongodb::bson::{doc, Document};
use rstest::rstest;

use wipedev::application::services::WipeOrchestrator;
use wipedev::application::ApplicationError;
use wipedev::config::Settings;
use wipedev::domain::{CallerIdentity, DomainError, ExecutionResult, WipeState};
use wipedev::util::testing::{init_test_setup, InMemoryDocumentStore, RecordingCommandRunner};

const CALLER: &str = "wipeuser";

const STOP_OBJECT_STORE: &str = "'/kb/deployment/services/shock_service/stop_service'";
const STOP_WORKSPACE: &str = "'/kb/deployment/services/workspace/stop_service'";
const START_OBJECT_STORE: &str = "'/kb/deployment/services/shock_service/start_service'";
const START_WORKSPACE: &str = "'/kb/deployment/services/workspace/start_service'";
const DELETE_FILES: &str = "rm -rfv -- '/mnt/Shock/data'/*";
const TRUNCATE: &str = "mysql -u root -e \"TRUNCATE TABLE hsi.Handle;\" && echo \"truncated hsi.Handle\"";

const DATABASE_MARKERS: &str = "saved settings from workspace.settings\n\
                                dropped database workspace\n\
                                dropped database ShockDB\n\
                                restored settings to workspace.settings\n\
                                reseeded ShockDB.Versions ACL=2\n\
                                reseeded ShockDB.Versions Auth=1\n\
                                reseeded ShockDB.Versions Node=2\n";

fn settings_document() -> Document {
    doc! { "_id": 1, "backend": "shock", "config_version": 3 }
}

fn seeded_store() -> Arc<InMemoryDocumentStore> {
    let store = InMemoryDocumentStore::new();
    store.insert("workspace", "settings", settings_document());
    store.insert("workspace", "objects", doc! { "_id": 7, "name": "stale" });
    store.insert("ShockDB", "Nodes", doc! { "_id": "n1" });
    Arc::new(store)
}

fn orchestrator(
    settings: &Settings,
    runner: &Arc<RecordingCommandRunner>,
    store: &Arc<InMemoryDocumentStore>,
) -> WipeOrchestrator {
    WipeOrchestrator::new(settings, runner.clone(), store.clone())
}

fn ran(command: &str) -> String {
    RecordingCommandRunner::default_output(command)
}

// ============================================================
// Happy path
// ============================================================

#[test]
fn given_all_steps_succeed_when_wiped_then_exit_zero_and_ordered_transcript() {
    // Arrange
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    // Act
    let outcome = sut
        .wipe_environment(&CallerIdentity::from(CALLER))
        .expect("wipe runs");

    // Assert
    let expected = [
        ran(STOP_OBJECT_STORE),
        ran(STOP_WORKSPACE),
        DATABASE_MARKERS.to_string(),
        ran(DELETE_FILES),
        ran(TRUNCATE),
        ran(START_OBJECT_STORE),
        ran(START_WORKSPACE),
    ]
    .concat();
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.output(), expected);
    assert_eq!(outcome.state(), WipeState::Done);
    assert_eq!(
        runner.calls(),
        vec![
            STOP_OBJECT_STORE,
            STOP_WORKSPACE,
            DELETE_FILES,
            TRUNCATE,
            START_OBJECT_STORE,
            START_WORKSPACE
        ]
    );
}

#[test]
fn given_all_steps_succeed_when_wiped_then_settings_survive_and_data_is_gone() {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(
        store.documents("workspace", "settings"),
        vec![settings_document()]
    );
    assert!(store.documents("workspace", "objects").is_empty());
    assert!(store.documents("ShockDB", "Nodes").is_empty());
    let versions: Vec<String> = store
        .documents("ShockDB", "Versions")
        .iter()
        .filter_map(|d| d.get_str("name").ok().map(str::to_string))
        .collect();
    assert_eq!(versions, vec!["ACL", "Auth", "Node"]);
}

#[test]
fn given_database_step_when_wiped_then_snapshot_precedes_drops() {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    let ops = store.operations();
    assert_eq!(ops[0], "find workspace.settings");
    assert_eq!(ops[1], "drop workspace");
    assert_eq!(ops[2], "drop ShockDB");
    assert_eq!(ops[3], "upsert workspace.settings");
    assert!(ops[4..].iter().all(|op| op == "upsert ShockDB.Versions"));
}

#[test]
fn given_wipe_run_twice_when_second_completes_then_state_identical() {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    let first = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();
    let versions_after_first = store.documents("ShockDB", "Versions");
    let second = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(first, second);
    assert_eq!(store.documents("ShockDB", "Versions"), versions_after_first);
    assert_eq!(
        store.documents("workspace", "settings"),
        vec![settings_document()]
    );
}

// ============================================================
// Fail-fast
// ============================================================

#[test]
fn given_first_stop_fails_when_wiped_then_nothing_else_runs() {
    // Arrange
    init_test_setup();
    let runner = Arc::new(
        RecordingCommandRunner::new().respond(
            STOP_OBJECT_STORE,
            ExecutionResult::new(3, "failed: permission denied"),
        ),
    );
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    // Act
    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    // Assert
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(outcome.output(), "failed: permission denied");
    assert_eq!(outcome.state(), WipeState::FailedAtStep(1));
    assert_eq!(runner.calls().len(), 1);
    assert!(store.operations().is_empty());
    assert_eq!(store.documents("workspace", "objects").len(), 1);
}

#[rstest]
#[case::stop_workspace(STOP_WORKSPACE, 2, 1)]
#[case::delete_files(DELETE_FILES, 4, 2)]
#[case::truncate(TRUNCATE, 5, 3)]
#[case::start_object_store(START_OBJECT_STORE, 6, 4)]
#[case::start_workspace(START_WORKSPACE, 7, 5)]
fn given_command_step_fails_when_wiped_then_later_steps_skipped(
    #[case] failing: &str,
    #[case] step: usize,
    #[case] commands_before: usize,
) {
    init_test_setup();
    let runner =
        Arc::new(RecordingCommandRunner::new().respond(failing, ExecutionResult::new(42, "boom\n")));
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(outcome.exit_code(), 42);
    assert_eq!(outcome.state(), WipeState::FailedAtStep(step));
    assert!(outcome.output().ends_with("boom\n"));
    let calls = runner.calls();
    assert_eq!(calls.len(), commands_before + 1);
    assert_eq!(calls.last().map(String::as_str), Some(failing));
}

#[test]
fn given_truncate_fails_when_wiped_then_transcript_has_every_executed_step() {
    init_test_setup();
    let runner = Arc::new(
        RecordingCommandRunner::new().respond("TRUNCATE", ExecutionResult::new(1, "ERROR 1146\n")),
    );
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    let expected = [
        ran(STOP_OBJECT_STORE),
        ran(STOP_WORKSPACE),
        DATABASE_MARKERS.to_string(),
        ran(DELETE_FILES),
        "ERROR 1146\n".to_string(),
    ]
    .concat();
    assert_eq!(outcome.output(), expected);
    assert_eq!(outcome.exit_code(), 1);
}

#[test]
fn given_negative_exit_code_when_wiped_then_treated_as_failure() {
    init_test_setup();
    let runner = Arc::new(
        RecordingCommandRunner::new().respond(STOP_OBJECT_STORE, ExecutionResult::new(-1, "")),
    );
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(outcome.exit_code(), -1);
    assert_eq!(runner.calls().len(), 1);
}

// ============================================================
// Database step errors
// ============================================================

#[test]
fn given_database_unreachable_mid_step_when_wiped_then_aborted_with_transcript() {
    // Arrange
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = InMemoryDocumentStore::new().fail_on("drop");
    store.insert("workspace", "settings", settings_document());
    let store = Arc::new(store);
    let sut = orchestrator(&Settings::default(), &runner, &store);

    // Act
    let err = sut
        .wipe_environment(&CallerIdentity::from(CALLER))
        .unwrap_err();

    // Assert
    match err {
        ApplicationError::Aborted {
            step,
            transcript,
            source,
        } => {
            assert_eq!(step, 3);
            assert_eq!(
                transcript,
                [
                    ran(STOP_OBJECT_STORE),
                    ran(STOP_WORKSPACE),
                    "saved settings from workspace.settings\n".to_string(),
                ]
                .concat()
            );
            assert!(matches!(*source, ApplicationError::Connectivity { .. }));
        }
        other => panic!("expected Aborted, got {:?}", other),
    }
    assert_eq!(runner.calls(), vec![STOP_OBJECT_STORE, STOP_WORKSPACE]);
}

#[test]
fn given_missing_settings_document_when_wiped_then_drops_and_reseeds_anyway() {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = Arc::new(InMemoryDocumentStore::new());
    store.insert("ShockDB", "Nodes", doc! { "_id": "n1" });
    let sut = orchestrator(&Settings::default(), &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.state(), WipeState::Done);
    assert!(outcome.output().contains(
        "no settings document in workspace.settings, nothing to restore\n\
         dropped database workspace\n\
         dropped database ShockDB\n\
         reseeded ShockDB.Versions ACL=2\n"
    ));
    assert!(!outcome.output().contains("restored settings"));
    assert!(store.documents("ShockDB", "Nodes").is_empty());
    assert!(store.documents("workspace", "settings").is_empty());
    assert_eq!(store.documents("ShockDB", "Versions").len(), 3);
}

#[test]
fn given_store_dropped_out_after_metadata_drop_when_rerun_then_wipe_completes() {
    // Arrange: settings are gone after the first, aborted run
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = InMemoryDocumentStore::new().fail_once_on("drop ShockDB");
    store.insert("workspace", "settings", settings_document());
    store.insert("ShockDB", "Nodes", doc! { "_id": "n1" });
    let store = Arc::new(store);
    let sut = orchestrator(&Settings::default(), &runner, &store);
    let caller = CallerIdentity::from(CALLER);

    let first = sut.wipe_environment(&caller).unwrap_err();
    assert!(matches!(
        first.root(),
        ApplicationError::Connectivity { .. }
    ));
    assert!(store.documents("workspace", "settings").is_empty());

    // Act
    let second = sut.wipe_environment(&caller).expect("rerun completes");
    let third = sut.wipe_environment(&caller).expect("rerun completes again");

    // Assert
    for outcome in [&second, &third] {
        assert_eq!(outcome.exit_code(), 0);
        assert_eq!(outcome.state(), WipeState::Done);
        assert!(outcome.output().contains("nothing to restore"));
    }
    assert!(store.documents("ShockDB", "Nodes").is_empty());
    assert_eq!(store.documents("ShockDB", "Versions").len(), 3);
    assert_eq!(runner.calls().last().map(String::as_str), Some(START_WORKSPACE));
}

// ============================================================
// Authorization
// ============================================================

#[rstest]
#[case("attacker")]
#[case("")]
#[case("WIPEUSER")]
#[case("wipeuser ")]
fn given_wrong_caller_when_any_operation_then_rejected_without_side_effects(
    #[case] caller: &str,
) {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);
    let caller = CallerIdentity::from(caller);

    let wipe = sut.wipe_environment(&caller).unwrap_err();
    let stop = sut.stop_workspace_service(&caller).unwrap_err();
    let start = sut.start_workspace_service(&caller).unwrap_err();

    for err in [wipe, stop, start] {
        assert!(matches!(
            err,
            ApplicationError::Domain(DomainError::Unauthorized { .. })
        ));
    }
    assert!(runner.calls().is_empty());
    assert!(store.operations().is_empty());
}

// ============================================================
// Configuration variants
// ============================================================

#[test]
fn given_unmanaged_workspace_when_wiped_then_workspace_scripts_not_run() {
    init_test_setup();
    let mut settings = Settings::default();
    settings.wipe.manage_workspace_service = false;
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&settings, &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(sut.plan().len(), 5);
    assert_eq!(
        runner.calls(),
        vec![STOP_OBJECT_STORE, DELETE_FILES, TRUNCATE, START_OBJECT_STORE]
    );
}

#[test]
fn given_reseed_admin_enabled_when_wiped_then_admin_record_created() {
    init_test_setup();
    let mut settings = Settings::default();
    settings.wipe.reseed_admin = true;
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&settings, &runner, &store);

    let outcome = sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert!(outcome
        .output()
        .contains("reseeded ShockDB.Users admin wipedevadmin\n"));
    let users = store.documents("ShockDB", "Users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].get_str("username").ok(), Some("wipedevadmin"));
}

#[test]
fn given_reseed_admin_disabled_when_wiped_then_no_user_records() {
    init_test_setup();
    let runner = Arc::new(RecordingCommandRunner::new());
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);

    sut.wipe_environment(&CallerIdentity::from(CALLER)).unwrap();

    assert!(store.documents("ShockDB", "Users").is_empty());
}

// ============================================================
// Standalone workspace operations
// ============================================================

#[test]
fn given_authorized_caller_when_workspace_stopped_and_started_then_single_script_each() {
    init_test_setup();
    let runner = Arc::new(
        RecordingCommandRunner::new().respond(START_WORKSPACE, ExecutionResult::new(5, "port busy")),
    );
    let store = seeded_store();
    let sut = orchestrator(&Settings::default(), &runner, &store);
    let caller = CallerIdentity::from(CALLER);

    let stopped = sut.stop_workspace_service(&caller).unwrap();
    let started = sut.start_workspace_service(&caller).unwrap();

    assert_eq!(stopped, ExecutionResult::success(ran(STOP_WORKSPACE)));
    assert_eq!(started, ExecutionResult::new(5, "port busy"));
    assert_eq!(runner.calls(), vec![STOP_WORKSPACE, START_WORKSPACE]);
    assert!(store.operations().is_empty());
}
