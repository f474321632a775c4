//! Wipe sequence model: steps, stages, state machine and transcript

use std::fmt;

use super::{ExecutionResult, ServiceId};

/// Coarse phase of the wipe sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStage {
    StoppingServices,
    WipingDatabases,
    ClearingFiles,
    WipingRelationalTable,
    RestartingServices,
}

/// One unit of work in the wipe sequence. Each step yields one `ExecutionResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeStep {
    StopService(ServiceId),
    /// Snapshot settings, drop both databases, restore settings, reseed records.
    ResetDatabases,
    WipeObjectStoreFiles,
    TruncateHandleTable,
    StartService(ServiceId),
}

impl WipeStep {
    pub fn stage(&self) -> WipeStage {
        match self {
            WipeStep::StopService(_) => WipeStage::StoppingServices,
            WipeStep::ResetDatabases => WipeStage::WipingDatabases,
            WipeStep::WipeObjectStoreFiles => WipeStage::ClearingFiles,
            WipeStep::TruncateHandleTable => WipeStage::WipingRelationalTable,
            WipeStep::StartService(_) => WipeStage::RestartingServices,
        }
    }

    /// Ordered step list for the main wipe operation.
    ///
    /// With `manage_workspace` unset the workspace service is left to the
    /// standalone stop/start operations.
    pub fn plan(manage_workspace: bool) -> Vec<WipeStep> {
        let mut steps = vec![WipeStep::StopService(ServiceId::ObjectStore)];
        if manage_workspace {
            steps.push(WipeStep::StopService(ServiceId::Workspace));
        }
        steps.extend([
            WipeStep::ResetDatabases,
            WipeStep::WipeObjectStoreFiles,
            WipeStep::TruncateHandleTable,
            WipeStep::StartService(ServiceId::ObjectStore),
        ]);
        if manage_workspace {
            steps.push(WipeStep::StartService(ServiceId::Workspace));
        }
        steps
    }
}

impl fmt::Display for WipeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WipeStep::StopService(id) => write!(f, "stop {} service", id),
            WipeStep::ResetDatabases => f.write_str("reset databases"),
            WipeStep::WipeObjectStoreFiles => f.write_str("delete object-store files"),
            WipeStep::TruncateHandleTable => f.write_str("truncate handle table"),
            WipeStep::StartService(id) => write!(f, "start {} service", id),
        }
    }
}

/// Orchestrator state. `Done` and `FailedAtStep` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WipeState {
    NotStarted,
    Running(WipeStage),
    Done,
    /// 1-based position in the plan of the step that failed.
    FailedAtStep(usize),
}

/// Step output concatenated in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    text: String,
}

impl Transcript {
    pub fn push(&mut self, result: &ExecutionResult) {
        self.text.push_str(result.output());
    }

    pub fn push_str(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

/// Final result of the main wipe operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WipeOutcome {
    result: ExecutionResult,
    state: WipeState,
}

impl WipeOutcome {
    pub fn new(result: ExecutionResult, state: WipeState) -> Self {
        Self { result, state }
    }

    pub fn exit_code(&self) -> i32 {
        self.result.exit_code()
    }

    pub fn output(&self) -> &str {
        self.result.output()
    }

    pub fn state(&self) -> WipeState {
        self.state
    }

    pub fn into_parts(self) -> (i32, String) {
        self.result.into_parts()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_managed_workspace_when_planned_then_full_sequence() {
        let plan = WipeStep::plan(true);
        assert_eq!(
            plan,
            vec![
                WipeStep::StopService(ServiceId::ObjectStore),
                WipeStep::StopService(ServiceId::Workspace),
                WipeStep::ResetDatabases,
                WipeStep::WipeObjectStoreFiles,
                WipeStep::TruncateHandleTable,
                WipeStep::StartService(ServiceId::ObjectStore),
                WipeStep::StartService(ServiceId::Workspace),
            ]
        );
    }

    #[test]
    fn given_unmanaged_workspace_when_planned_then_workspace_untouched() {
        let plan = WipeStep::plan(false);
        assert_eq!(plan.len(), 5);
        assert!(!plan.contains(&WipeStep::StopService(ServiceId::Workspace)));
        assert!(!plan.contains(&WipeStep::StartService(ServiceId::Workspace)));
    }

    #[test]
    fn given_plan_when_staged_then_stages_never_go_backwards() {
        let stages: Vec<_> = WipeStep::plan(true).iter().map(|s| s.stage()).collect();
        let order = |s: &WipeStage| *s as u8;
        assert!(stages.windows(2).all(|w| order(&w[0]) <= order(&w[1])));
    }

    #[test]
    fn given_fragments_when_pushed_then_concatenated_verbatim() {
        let mut transcript = Transcript::default();
        transcript.push(&ExecutionResult::success("a\n"));
        transcript.push(&ExecutionResult::new(2, "b"));
        assert_eq!(transcript.into_string(), "a\nb");
    }
}
