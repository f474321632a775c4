//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;
use std::time::Duration;

use crate::application::services::{
    IdTranslator, RunnerScriptGenerator, TestSummarizer, WipeOrchestrator,
};
use crate::config::Settings;
use crate::infrastructure::http::{HttpIdLookup, JenkinsReportSource};
use crate::infrastructure::mongo::MongoDocumentStore;
use crate::infrastructure::traits::{CommandRunner, DocumentStore, ShellCommandRunner};
use crate::infrastructure::{InfraError, InfraResult};

/// Container holding all application services.
///
/// Only the wipe boundaries are held; HTTP clients are built on demand
/// since most invocations never need them.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Command runner abstraction
    pub cmd: Arc<dyn CommandRunner>,

    /// Document database abstraction
    pub store: Arc<dyn DocumentStore>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// The database driver connects lazily, so this performs no I/O.
    pub fn new(settings: Settings) -> InfraResult<Self> {
        let store = MongoDocumentStore::connect(&settings.mongo.uri)?;
        Ok(Self::with_deps(
            settings,
            Arc::new(ShellCommandRunner),
            Arc::new(store),
        ))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        cmd: Arc<dyn CommandRunner>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            cmd,
            store,
        }
    }

    /// Wipe orchestrator over validated settings.
    pub fn orchestrator(&self) -> InfraResult<WipeOrchestrator> {
        self.settings.validate()?;
        Ok(WipeOrchestrator::new(
            &self.settings,
            self.cmd.clone(),
            self.store.clone(),
        ))
    }

    pub fn runner_script_generator(&self) -> RunnerScriptGenerator {
        RunnerScriptGenerator::new(self.settings.runner.clone())
    }

    pub fn test_summarizer(&self) -> InfraResult<TestSummarizer> {
        let r = &self.settings.reports;
        let source = JenkinsReportSource::new(
            &r.base_url,
            &r.suite,
            Duration::from_secs(r.timeout_secs),
        )
        .map_err(|message| InfraError::Http { message })?;
        Ok(TestSummarizer::new(Arc::new(source)))
    }

    pub fn id_translator(&self) -> InfraResult<IdTranslator> {
        let t = &self.settings.translate;
        let lookup = HttpIdLookup::new(&t.url_prefix, Duration::from_secs(t.timeout_secs))
            .map_err(|message| InfraError::Http { message })?;
        Ok(IdTranslator::new(
            Arc::new(lookup),
            Duration::from_secs(t.retry_pause_secs),
        ))
    }
}
