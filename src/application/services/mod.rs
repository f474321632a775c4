//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (CommandRunner, DocumentStore, etc.)
//! but are themselves concrete structs, not traits.

mod database;
mod files;
mod id_translate;
mod orchestrator;
mod relational;
mod runner_script;
mod service_control;
mod test_summary;

pub use database::DatabaseWiper;
pub use files::FilesystemWiper;
pub use id_translate::{IdTranslator, TranslateStats, ERROR_MARKER};
pub use orchestrator::WipeOrchestrator;
pub use relational::RelationalTableWiper;
pub use runner_script::{RunnerScriptGenerator, GENERATED_HEADER};
pub use service_control::ServiceController;
pub use test_summary::{TestStats, TestSummarizer, TestSummary};
