//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with fake implementations.

use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use mongodb::bson::Document;
use thiserror::Error;
use tracing::{debug, trace};

use crate::domain::{ExecutionResult, JobReport};

/// Exit code reported when the shell itself cannot be spawned.
pub const SPAWN_FAILURE_EXIT: i32 = 127;

/// External command runner abstraction.
///
/// Never fails: spawn errors and non-zero exits are both reported as
/// `ExecutionResult` so callers keep the diagnostic text.
pub trait CommandRunner: Send + Sync {
    /// Run a shell command line, capturing stdout and stderr as one stream.
    fn run(&self, command_line: &str) -> ExecutionResult;
}

/// Document-database failure (unreachable server, rejected write, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation}: {message}")]
pub struct StoreError {
    pub operation: String,
    pub message: String,
}

impl StoreError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Document-database abstraction.
pub trait DocumentStore: Send + Sync {
    /// First document of a collection, if any.
    fn find_one(&self, database: &str, collection: &str) -> Result<Option<Document>, StoreError>;

    /// Replace the document whose `key` field matches `document[key]`, inserting if absent.
    fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError>;

    /// Drop a whole database. Dropping a missing database succeeds.
    fn drop_database(&self, database: &str) -> Result<(), StoreError>;
}

/// Failure fetching a CI job report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("job {job}: {message}")]
pub struct FetchError {
    pub job: u32,
    pub message: String,
}

/// Source of CI job test reports.
pub trait ReportSource: Send + Sync {
    fn fetch(&self, job: u32) -> Result<JobReport, FetchError>;
}

/// Failure looking up one identifier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Network-level problem; the same request may succeed later
    #[error("transient: {0}")]
    Transient(String),

    /// The server answered with an error; retrying will not help
    #[error("{0}")]
    Permanent(String),
}

/// Remote identifier translation.
pub trait IdLookup: Send + Sync {
    fn lookup(&self, id: &str) -> Result<String, LookupError>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Runs command lines through `sh -c` with stderr folded into stdout.
#[derive(Debug, Default)]
pub struct ShellCommandRunner;

/// Single-quote a path so `sh` treats it as one word.
pub fn shell_quote(path: &Path) -> String {
    format!("'{}'", path.to_string_lossy().replace('\'', r"'\''"))
}

impl ShellCommandRunner {
    fn wrap(command_line: &str) -> String {
        // Redirect at the shell level so stdout and stderr interleave in order.
        format!("{{ {}\n}} 2>&1", command_line)
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run(&self, command_line: &str) -> ExecutionResult {
        debug!("run: {}", command_line);
        let child = Command::new("sh")
            .arg("-c")
            .arg(Self::wrap(command_line))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::new(
                    SPAWN_FAILURE_EXIT,
                    format!("failed to spawn `{}`: {}\n", command_line, e),
                )
            }
        };

        let mut output = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            read_into(stdout, "output", &mut output);
        }
        // Anything the shell itself wrote before the redirect took effect
        if let Some(stderr) = child.stderr.take() {
            read_into(stderr, "error output", &mut output);
        }

        let exit_code = match child.wait() {
            Ok(status) => exit_code_of(status),
            Err(e) => {
                output.extend_from_slice(format!("\nfailed to wait for process: {}\n", e).as_bytes());
                SPAWN_FAILURE_EXIT
            }
        };
        trace!("exit {}: {}", exit_code, command_line);

        ExecutionResult::new(exit_code, String::from_utf8_lossy(&output).into_owned())
    }
}

/// Append everything from `stream`; a read failure is noted in the output.
fn read_into(mut stream: impl Read, what: &str, output: &mut Vec<u8>) {
    if let Err(e) = stream.read_to_end(output) {
        output.extend_from_slice(format!("\nfailed to read {}: {}\n", what, e).as_bytes());
    }
}

/// Map an exit status to a non-negative code, using 128 + signal for killed processes.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}
