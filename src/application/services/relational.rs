//! Relational handle table truncation

use std::sync::Arc;

use tracing::{info, instrument};

use crate::config::RelationalConfig;
use crate::domain::ExecutionResult;
use crate::infrastructure::traits::CommandRunner;

/// Truncates the handle table through the database's command-line client.
pub struct RelationalTableWiper {
    cmd: Arc<dyn CommandRunner>,
    relational: RelationalConfig,
}

impl RelationalTableWiper {
    pub fn new(cmd: Arc<dyn CommandRunner>, relational: RelationalConfig) -> Self {
        Self { cmd, relational }
    }

    /// Identifiers are validated by `Settings::validate`, so they are spliced in unquoted.
    pub fn command_line(&self) -> String {
        let r = &self.relational;
        format!(
            "{} -u {} -e \"TRUNCATE TABLE {}.{};\" && echo \"truncated {}.{}\"",
            r.client, r.user, r.database, r.table, r.database, r.table
        )
    }

    #[instrument(skip(self), fields(table = %self.relational.table))]
    pub fn truncate_handle_table(&self) -> ExecutionResult {
        info!("truncating {}.{}", self.relational.database, self.relational.table);
        self.cmd.run(&self.command_line())
    }
}
