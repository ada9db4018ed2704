use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("manifest template error: {0}")]
    Tera(#[from] tera::Error),

    #[error("failed to build template context: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An override template exists but cannot be read.
    #[error("cannot read template override {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
