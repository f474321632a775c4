//! Domain entities: core data structures

use std::fmt;

use mongodb::bson::Document;
use serde::{Deserialize, Serialize};

/// Outcome of one step: exit code plus captured text.
///
/// Exit code 0 is success. Every other value, including negative ones,
/// counts as failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    exit_code: i32,
    output: String,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    /// Successful result carrying `output`.
    pub fn success(output: impl Into<String>) -> Self {
        Self::new(0, output)
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn into_parts(self) -> (i32, String) {
        (self.exit_code, self.output)
    }
}

/// Identity supplied by the caller on every exposed operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    pub fn new(identity: impl Into<String>) -> Self {
        Self(identity.into())
    }
}

impl From<&str> for CallerIdentity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CallerIdentity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Services the wipe sequence stops and starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceId {
    /// Blob storage backend
    ObjectStore,
    /// Metadata database service
    Workspace,
}

impl ServiceId {
    pub fn name(&self) -> &'static str {
        match self {
            ServiceId::ObjectStore => "object-store",
            ServiceId::Workspace => "workspace",
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Schema version record the object store expects in its version collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    pub name: String,
    pub version: i32,
}

impl VersionRecord {
    pub fn new(name: impl Into<String>, version: i32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// The fixed records reseeded after the object-store database is dropped.
    pub fn bootstrap() -> Vec<VersionRecord> {
        vec![
            VersionRecord::new("ACL", 2),
            VersionRecord::new("Auth", 1),
            VersionRecord::new("Node", 2),
        ]
    }
}

/// Opaque copy of the metadata settings document.
///
/// Written back unchanged after the metadata database is dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsSnapshot {
    document: Document,
}

impl SettingsSnapshot {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

/// Administrative account reseeded into the object store when enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminBootstrapRecord {
    pub uuid: String,
    pub username: String,
    pub fullname: String,
    pub email: String,
}

impl Default for AdminBootstrapRecord {
    fn default() -> Self {
        Self {
            uuid: "5f1c3a9e-8a4b-4c2e-9d3f-0b6a7e2d1c40".into(),
            username: "wipedevadmin".into(),
            fullname: "Wipe Admin".into(),
            email: String::new(),
        }
    }
}

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
///
/// Unknown variables leave the input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
