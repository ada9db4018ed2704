//! Content-gated atomic writer for rendered manifests.
//!
//! ## `write_if_changed`
//!
//! 1. Normalise line endings to LF.
//! 2. Compare with the file on disk; identical content is left untouched so
//!    its mtime does not trigger a config-changed decision on the next run.
//! 3. Write to `<path>.launchpad.tmp`.
//! 4. Rename to the final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use launchpad_core::DeploymentTarget;
use launchpad_renderer::Renderer;

use crate::error::{io_err, SyncError};

// ---------------------------------------------------------------------------
// Write result
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// Content on disk already matched; nothing written.
    Unchanged { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path } | WriteResult::Unchanged { path } => path,
        }
    }

    pub fn changed(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }
}

// ---------------------------------------------------------------------------
// write_if_changed
// ---------------------------------------------------------------------------

/// Atomically write `content` to `path` unless it already holds that content.
pub fn write_if_changed(path: &Path, content: &str) -> Result<WriteResult, SyncError> {
    let tmp = PathBuf::from(format!("{}.launchpad.tmp", path.display()));
    write_with_tmp(path, content, &tmp)
}

fn write_with_tmp(path: &Path, content: &str, tmp: &Path) -> Result<WriteResult, SyncError> {
    let normalized = content.replace("\r\n", "\n");

    match std::fs::read_to_string(path) {
        Ok(existing) if existing.replace("\r\n", "\n") == normalized => {
            tracing::debug!(path = %path.display(), "manifest already current");
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    std::fs::write(tmp, &normalized).map_err(|e| io_err(tmp, e))?;

    std::fs::rename(tmp, path).map_err(|err| {
        let _ = std::fs::remove_file(tmp);
        io_err(path, err)
    })?;

    tracing::info!(path = %path.display(), "manifest written");
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// write_routes
// ---------------------------------------------------------------------------

/// Render both routes for `target` into `manifest_dir`.
pub fn write_routes(
    renderer: &Renderer,
    target: &DeploymentTarget,
    manifest_dir: &Path,
) -> Result<Vec<WriteResult>, SyncError> {
    let mut writes = Vec::new();
    for (path, content) in renderer.render_routes(target, manifest_dir)? {
        writes.push(write_if_changed(&path, &content)?);
    }
    Ok(writes)
}
