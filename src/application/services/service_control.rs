//! Service start/stop through per-service scripts

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::config::ServicesConfig;
use crate::domain::{ExecutionResult, ServiceId};
use crate::infrastructure::traits::{shell_quote, CommandRunner};

/// Starts and stops named services by running their configured scripts.
///
/// No retries; idempotence is whatever the script provides.
pub struct ServiceController {
    cmd: Arc<dyn CommandRunner>,
    scripts: ServicesConfig,
}

impl ServiceController {
    pub fn new(cmd: Arc<dyn CommandRunner>, scripts: ServicesConfig) -> Self {
        Self { cmd, scripts }
    }

    #[instrument(skip(self))]
    pub fn stop(&self, service: ServiceId) -> ExecutionResult {
        self.run_script(&self.scripts.scripts(service).stop)
    }

    #[instrument(skip(self))]
    pub fn start(&self, service: ServiceId) -> ExecutionResult {
        self.run_script(&self.scripts.scripts(service).start)
    }

    fn run_script(&self, script: &Path) -> ExecutionResult {
        let result = self.cmd.run(&shell_quote(script));
        debug!("{} -> exit {}", script.display(), result.exit_code());
        result
    }
}
