//! `io::Result` → `ApplicationResult` with the file or stream that failed

use std::io;
use std::path::Path;

use crate::application::{ApplicationError, ApplicationResult};

pub trait IoResultExt<T> {
    /// Failure on a named file, e.g. `"write runner script", out`.
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T>;

    /// Failure on stdin/stdout or another unnamed stream.
    fn with_stream_context(self, action: &str) -> ApplicationResult<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn with_path_context(self, action: &str, path: &Path) -> ApplicationResult<T> {
        self.map_err(|e| operation_failed(format!("{}: {}", action, path.display()), e))
    }

    fn with_stream_context(self, action: &str) -> ApplicationResult<T> {
        self.map_err(|e| operation_failed(action.to_string(), e))
    }
}

fn operation_failed(context: String, source: io::Error) -> ApplicationError {
    ApplicationError::OperationFailed {
        context,
        source: Box::new(source),
    }
}
