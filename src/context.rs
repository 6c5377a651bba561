//! Pipeline Context Access
//!
//! Read access to the ambient key-value variable store a CI pipeline exposes
//! to its tasks. The session request builder depends only on the
//! [`VariableReader`] trait, so tests and harnesses can substitute a
//! synthetic snapshot for the live environment.

use std::collections::HashMap;

/// Read-only view of the pipeline's variable store
pub trait VariableReader: Send + Sync {
    /// Look up a variable by its pipeline name (e.g. `Build.BuildId`).
    /// Returns `None` when the variable is not set.
    fn get_variable(&self, name: &str) -> Option<String>;
}

/// Reads pipeline variables from the process environment.
///
/// Pipeline agents export variables with mangled names: uppercased, with
/// `.` and spaces replaced by `_` (`Release.ReleaseId` becomes
/// `RELEASE_RELEASEID`).
#[derive(Debug, Clone, Default)]
pub struct EnvReader;

impl EnvReader {
    pub fn new() -> Self {
        Self
    }
}

/// Convert a pipeline variable name to its environment-variable form
pub fn env_var_name(name: &str) -> String {
    name.replace(['.', ' '], "_").to_uppercase()
}

impl VariableReader for EnvReader {
    fn get_variable(&self, name: &str) -> Option<String> {
        std::env::var(env_var_name(name)).ok()
    }
}

/// In-memory variable snapshot.
///
/// Used by tests and by harnesses that capture the context once up front
/// and want deterministic reads afterwards.
#[derive(Debug, Clone, Default)]
pub struct SnapshotReader {
    variables: HashMap<String, String>,
}

impl SnapshotReader {
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Add a variable to the snapshot, replacing any previous value.
    pub fn set(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }
}

impl From<HashMap<String, String>> for SnapshotReader {
    fn from(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }
}

impl VariableReader for SnapshotReader {
    fn get_variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }
}
