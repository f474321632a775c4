//! Fail-fast environment wipe
//!
//! Runs the planned steps strictly in order. The first step whose exit code
//! is not 0 ends the run; its code and the transcript of every executed step
//! are returned. Nothing already done is rolled back: the target is
//! disposable and the wipe is simply rerun.

use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::{DatabaseWiper, FilesystemWiper, RelationalTableWiper, ServiceController};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::Settings;
use crate::domain::{
    AdminBootstrapRecord, AuthorizationGate, CallerIdentity, ExecutionResult, ServiceId,
    Transcript, WipeOutcome, WipeState, WipeStep,
};
use crate::infrastructure::traits::{CommandRunner, DocumentStore};

pub struct WipeOrchestrator {
    gate: AuthorizationGate,
    services: ServiceController,
    database: DatabaseWiper,
    files: FilesystemWiper,
    table: RelationalTableWiper,
    manage_workspace: bool,
    admin: Option<AdminBootstrapRecord>,
}

impl WipeOrchestrator {
    /// Build the orchestrator from validated settings and its I/O boundaries.
    pub fn new(
        settings: &Settings,
        cmd: Arc<dyn CommandRunner>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            gate: AuthorizationGate::new(settings.auth.allowed_caller.as_str()),
            services: ServiceController::new(cmd.clone(), settings.services.clone()),
            database: DatabaseWiper::new(store, settings.mongo.clone()),
            files: FilesystemWiper::new(cmd.clone(), settings.object_store.data_dir.clone()),
            table: RelationalTableWiper::new(cmd, settings.relational.clone()),
            manage_workspace: settings.wipe.manage_workspace_service,
            admin: settings
                .wipe
                .reseed_admin
                .then(|| settings.wipe.admin.clone()),
        }
    }

    /// Steps the main wipe will execute, in order.
    pub fn plan(&self) -> Vec<WipeStep> {
        WipeStep::plan(self.manage_workspace)
    }

    /// Destroy and recreate the environment.
    ///
    /// Returns `Ok` for both success and step failure; inspect the outcome's
    /// exit code. `Err` means the caller was rejected (nothing ran) or the
    /// database became unreachable (the error carries the transcript).
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn wipe_environment(&self, caller: &CallerIdentity) -> ApplicationResult<WipeOutcome> {
        self.gate.check_caller(caller)?;

        let mut transcript = Transcript::default();
        let mut state = WipeState::NotStarted;
        info!("wipe started, state {:?}", state);

        for (index, step) in self.plan().into_iter().enumerate() {
            let number = index + 1;
            state = WipeState::Running(step.stage());
            info!("step {}: {} ({:?})", number, step, state);

            let result = match self.execute(step, &mut transcript) {
                Ok(result) => result,
                Err(source) => {
                    error!("step {} ({}) aborted: {}", number, step, source);
                    return Err(ApplicationError::Aborted {
                        step: number,
                        transcript: transcript.into_string(),
                        source: Box::new(source),
                    });
                }
            };
            transcript.push(&result);

            if !result.is_success() {
                state = WipeState::FailedAtStep(number);
                warn!(
                    "step {} ({}) failed with exit {}, halting",
                    number,
                    step,
                    result.exit_code()
                );
                return Ok(WipeOutcome::new(
                    ExecutionResult::new(result.exit_code(), transcript.into_string()),
                    state,
                ));
            }
        }

        state = WipeState::Done;
        info!("wipe complete");
        Ok(WipeOutcome::new(
            ExecutionResult::success(transcript.into_string()),
            state,
        ))
    }

    /// Stop only the workspace service.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn stop_workspace_service(&self, caller: &CallerIdentity) -> ApplicationResult<ExecutionResult> {
        self.gate.check_caller(caller)?;
        Ok(self.services.stop(ServiceId::Workspace))
    }

    /// Start only the workspace service.
    #[instrument(skip_all, fields(caller = %caller))]
    pub fn start_workspace_service(&self, caller: &CallerIdentity) -> ApplicationResult<ExecutionResult> {
        self.gate.check_caller(caller)?;
        Ok(self.services.start(ServiceId::Workspace))
    }

    fn execute(&self, step: WipeStep, transcript: &mut Transcript) -> ApplicationResult<ExecutionResult> {
        match step {
            WipeStep::StopService(service) => Ok(self.services.stop(service)),
            WipeStep::ResetDatabases => self.reset_databases(transcript),
            WipeStep::WipeObjectStoreFiles => Ok(self.files.wipe_object_store_files()),
            WipeStep::TruncateHandleTable => Ok(self.table.truncate_handle_table()),
            WipeStep::StartService(service) => Ok(self.services.start(service)),
        }
    }

    /// Database step. Emits one marker line per completed sub-operation; if a
    /// sub-operation raises, the lines so far go straight into `transcript`.
    fn reset_databases(&self, transcript: &mut Transcript) -> ApplicationResult<ExecutionResult> {
        let mut lines = String::new();
        match self.reset_databases_inner(&mut lines) {
            Ok(()) => Ok(ExecutionResult::success(lines)),
            Err(e) => {
                transcript.push_str(&lines);
                Err(e)
            }
        }
    }

    fn reset_databases_inner(&self, lines: &mut String) -> ApplicationResult<()> {
        let m = self.database.config();

        let snapshot = self.database.snapshot_settings()?;
        match &snapshot {
            Some(_) => lines.push_str(&format!(
                "saved settings from {}.{}\n",
                m.workspace_db, m.settings_collection
            )),
            None => lines.push_str(&format!(
                "no settings document in {}.{}, nothing to restore\n",
                m.workspace_db, m.settings_collection
            )),
        }

        self.database.drop_metadata_database()?;
        lines.push_str(&format!("dropped database {}\n", m.workspace_db));

        self.database.drop_object_store_database()?;
        lines.push_str(&format!("dropped database {}\n", m.object_store_db));

        if let Some(snapshot) = snapshot {
            self.database.restore_settings(snapshot)?;
            lines.push_str(&format!(
                "restored settings to {}.{}\n",
                m.workspace_db, m.settings_collection
            ));
        }

        let records = self.database.reseed_version_records()?;
        for record in &records {
            lines.push_str(&format!(
                "reseeded {}.{} {}={}\n",
                m.object_store_db, m.version_collection, record.name, record.version
            ));
        }

        if let Some(admin) = &self.admin {
            self.database.reseed_admin_bootstrap_record(admin)?;
            lines.push_str(&format!(
                "reseeded {}.{} admin {}\n",
                m.object_store_db, m.user_collection, admin.username
            ));
        }
        Ok(())
    }
}
