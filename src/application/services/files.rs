//! Object-store backing file deletion

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, instrument};

use crate::domain::ExecutionResult;
use crate::infrastructure::traits::{shell_quote, CommandRunner};

/// Deletes everything under the object store's data directory.
///
/// Irreversible; there is no staging area.
pub struct FilesystemWiper {
    cmd: Arc<dyn CommandRunner>,
    data_dir: PathBuf,
}

impl FilesystemWiper {
    pub fn new(cmd: Arc<dyn CommandRunner>, data_dir: PathBuf) -> Self {
        Self { cmd, data_dir }
    }

    /// Shell command removing the directory contents but keeping the directory.
    pub fn command_line(&self) -> String {
        format!("rm -rfv -- {}/*", shell_quote(&self.data_dir))
    }

    #[instrument(skip(self), fields(data_dir = %self.data_dir.display()))]
    pub fn wipe_object_store_files(&self) -> ExecutionResult {
        info!("deleting object-store files");
        self.cmd.run(&self.command_line())
    }
}
