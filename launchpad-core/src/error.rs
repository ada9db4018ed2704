//! Error types for launchpad-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing the local state files (`.deploy-config`,
/// `.env`, `launchpad.yaml`).
#[derive(Debug, Error)]
pub enum StateError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A key=value file contained a line that is neither a comment nor an assignment.
    #[error("malformed line {line} in {path}: {content:?}")]
    Malformed {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// `launchpad.yaml` failed to parse.
    #[error("failed to parse settings at {path}: {source}")]
    Settings {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Fatal configuration problems. These abort before any stage runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The apps domain was not given and could not be derived from the API URL.
    #[error(
        "cannot infer the apps domain from API URL '{api}' (expected https://api.<cluster>:6443); \
         pass --domain explicitly"
    )]
    DomainInference { api: String },

    /// The local credential file is missing.
    #[error("credential file not found at {path}; create it with JIRA_URL, JIRA_PERSONAL_TOKEN and MAAS_* entries")]
    MissingEnvFile { path: PathBuf },

    /// A resolved target field is empty.
    #[error("deployment target field '{field}' is empty; pass it on the command line")]
    EmptyField { field: &'static str },

    #[error(transparent)]
    State(#[from] StateError),
}

/// Convenience constructor for [`StateError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
