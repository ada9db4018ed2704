//! Error types for launchpad-sync.

use std::path::PathBuf;

use thiserror::Error;

use launchpad_core::StateError;
use launchpad_renderer::RenderError;

/// All errors that can arise from reconcile preparation and secret handling.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the rendering engine.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// An error reading or writing a local state file.
    #[error(transparent)]
    State(#[from] StateError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest in the bundle is not valid YAML.
    #[error("manifest {path} is not valid YAML: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A live credential field could not be decoded.
    #[error("credential field '{field}' is not valid base64: {source}")]
    Decode {
        field: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
