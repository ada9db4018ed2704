//! Dry-run unified diff support for `launchpad diff`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use similar::TextDiff;

use launchpad_core::DeploymentTarget;
use launchpad_renderer::Renderer;

use crate::{error::io_err, SyncError};

/// A single rendered file diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    pub path: PathBuf,
    pub unified_diff: String,
}

/// Render the routes `target` needs and compare them to what is on disk.
///
/// No files are written. Files that already match are omitted.
pub fn diff_routes(
    renderer: &Renderer,
    target: &DeploymentTarget,
    manifest_dir: &Path,
) -> Result<Vec<FileDiff>, SyncError> {
    let mut diffs = Vec::new();
    for (path, rendered) in renderer.render_routes(target, manifest_dir)? {
        let rendered = rendered.replace("\r\n", "\n");
        let on_disk = route_on_disk(&path)?;
        if on_disk == rendered {
            continue;
        }

        let unified_diff = TextDiff::from_lines(&on_disk, &rendered)
            .unified_diff()
            .context_radius(3)
            .header(
                &format!("a/{}", path.display()),
                &format!("b/{}", path.display()),
            )
            .to_string();
        diffs.push(FileDiff { path, unified_diff });
    }
    Ok(diffs)
}

/// Current route manifest with LF endings; empty when it does not exist yet.
fn route_on_disk(path: &Path) -> Result<String, SyncError> {
    std::fs::read_to_string(path)
        .map(|content| content.replace("\r\n", "\n"))
        .or_else(|err| match err.kind() {
            ErrorKind::NotFound => Ok(String::new()),
            _ => Err(io_err(path, err)),
        })
}
