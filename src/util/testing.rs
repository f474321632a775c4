//! Test support: logging setup and in-process fakes for the I/O boundaries

use std::collections::BTreeMap;
use std::env;
use std::sync::{Mutex, Once};

use mongodb::bson::Document;
use tracing::{debug, info};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::ExecutionResult;
use crate::infrastructure::traits::{CommandRunner, DocumentStore, StoreError};

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    debug!("INIT: Attempting logger init from testing.rs");

    // Create a filter for noisy modules
    let noisy_modules = ["mongodb", "hyper", "reqwest", "rustls"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

// ============================================================
// Command runner fake
// ============================================================

/// Records every command line and answers from a script.
///
/// The first rule whose pattern is a substring of the command line wins.
/// Unmatched commands succeed with output `ran <command line>\n`.
#[derive(Default)]
pub struct RecordingCommandRunner {
    rules: Vec<(String, ExecutionResult)>,
    calls: Mutex<Vec<String>>,
}

impl RecordingCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, pattern: &str, result: ExecutionResult) -> Self {
        self.rules.push((pattern.to_string(), result));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Output the runner gives for `command_line` when no rule matches.
    pub fn default_output(command_line: &str) -> String {
        format!("ran {}\n", command_line)
    }
}

impl CommandRunner for RecordingCommandRunner {
    fn run(&self, command_line: &str) -> ExecutionResult {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command_line.to_string());
        }
        self.rules
            .iter()
            .find(|(pattern, _)| command_line.contains(pattern.as_str()))
            .map(|(_, result)| result.clone())
            .unwrap_or_else(|| ExecutionResult::success(Self::default_output(command_line)))
    }
}

// ============================================================
// Document store fake
// ============================================================

type Collections = BTreeMap<(String, String), Vec<Document>>;

/// In-memory document store with an operation log.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    collections: Mutex<Collections>,
    operations: Mutex<Vec<String>>,
    /// Log entry prefix (`find`, `upsert ShockDB`, `drop workspace`) that fails
    failing: Option<String>,
    /// Fail only the first matching operation, then behave normally
    fail_once: bool,
    failed: Mutex<usize>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every operation whose log entry starts with `operation` fail.
    pub fn fail_on(mut self, operation: &str) -> Self {
        self.failing = Some(operation.to_string());
        self
    }

    /// Fail the first operation starting with `operation` only, like a
    /// connection that drops once and comes back.
    pub fn fail_once_on(mut self, operation: &str) -> Self {
        self.failing = Some(operation.to_string());
        self.fail_once = true;
        self
    }

    pub fn insert(&self, database: &str, collection: &str, document: Document) {
        if let Ok(mut c) = self.collections.lock() {
            c.entry((database.to_string(), collection.to_string()))
                .or_default()
                .push(document);
        }
    }

    pub fn documents(&self, database: &str, collection: &str) -> Vec<Document> {
        self.collections
            .lock()
            .ok()
            .and_then(|c| c.get(&(database.to_string(), collection.to_string())).cloned())
            .unwrap_or_default()
    }

    /// Log entries like `drop workspace` or `upsert ShockDB.Versions`.
    pub fn operations(&self) -> Vec<String> {
        self.operations.lock().map(|o| o.clone()).unwrap_or_default()
    }

    fn record(&self, entry: String) -> Result<(), StoreError> {
        if let Ok(mut ops) = self.operations.lock() {
            ops.push(entry.clone());
        }
        let Some(prefix) = &self.failing else {
            return Ok(());
        };
        if !entry.starts_with(prefix.as_str()) {
            return Ok(());
        }
        let mut failed = self
            .failed
            .lock()
            .map_err(|e| StoreError::new("lock", e.to_string()))?;
        if self.fail_once && *failed > 0 {
            return Ok(());
        }
        *failed += 1;
        Err(StoreError::new(entry, "connection refused"))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Collections>, StoreError> {
        self.collections
            .lock()
            .map_err(|e| StoreError::new("lock", e.to_string()))
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn find_one(&self, database: &str, collection: &str) -> Result<Option<Document>, StoreError> {
        self.record(format!("find {}.{}", database, collection))?;
        Ok(self
            .lock()?
            .get(&(database.to_string(), collection.to_string()))
            .and_then(|docs| docs.first().cloned()))
    }

    fn upsert(
        &self,
        database: &str,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.record(format!("upsert {}.{}", database, collection))?;
        let value = document
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::new("upsert", format!("document has no '{}' field", key)))?;

        let mut collections = self.lock()?;
        let docs = collections
            .entry((database.to_string(), collection.to_string()))
            .or_default();
        match docs.iter_mut().find(|d| d.get(key) == Some(&value)) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
        Ok(())
    }

    fn drop_database(&self, database: &str) -> Result<(), StoreError> {
        self.record(format!("drop {}", database))?;
        self.lock()?.retain(|(db, _), _| db != database);
        Ok(())
    }
}
