//! Application-level errors (wraps domain errors)

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::DomainError;
use crate::infrastructure::traits::{FetchError, StoreError};

/// Application errors wrap domain errors and add application-level context.
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("database unreachable while trying to {context}: {source}")]
    Connectivity {
        context: String,
        #[source]
        source: StoreError,
    },

    /// A step raised instead of returning a result; carries everything printed so far.
    #[error("wipe aborted at step {step}: {source}")]
    Aborted {
        step: usize,
        transcript: String,
        #[source]
        source: Box<ApplicationError>,
    },

    #[error("failed to fetch report: {0}")]
    Fetch(#[from] FetchError),

    #[error("test config {path}: {message}")]
    RunnerConfig { path: PathBuf, message: String },

    #[error("operation failed: {context}")]
    OperationFailed {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplicationError {
    /// Innermost error, looking through `Aborted`.
    pub fn root(&self) -> &ApplicationError {
        match self {
            ApplicationError::Aborted { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for application layer operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
