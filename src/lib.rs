//! wipedev: reset a disposable deployment to a clean state
//!
//! Stops the object store and workspace services, resets the document
//! databases (preserving the workspace settings document), empties the
//! object store's data directory, truncates the handle table, and starts
//! the services again. Side tools generate the integration test runner,
//! summarize CI test reports and translate identifiers.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
