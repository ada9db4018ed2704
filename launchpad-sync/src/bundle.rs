//! Declarative bundle selection.
//!
//! The bundle is every `*.yaml`/`*.yml` file under the manifest directory.
//! When live credentials must be preserved, `Secret` resources are left out
//! of the apply. Files without one are applied as they are; the remaining
//! documents of files that mix a `Secret` with other resources are gathered
//! into one stream for `oc apply -f -`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{io_err, SyncError};

/// What to hand to `oc apply`, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyPlan {
    /// Files applied unchanged.
    pub files: Vec<PathBuf>,
    /// Files whose `Secret` resources were left out to protect live credentials.
    pub excluded: Vec<PathBuf>,
    /// Non-secret documents of the excluded files, as one YAML stream.
    pub retained: Option<String>,
}

/// All manifest files under `dir`, sorted. A missing directory is empty.
pub fn manifest_files(dir: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut out = Vec::new();
    collect(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SyncError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(io_err(dir, err)),
    };
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            collect(&path, out)?;
        } else if file_type.is_file() && is_manifest(&path) {
            out.push(path);
        }
    }
    Ok(())
}

fn is_manifest(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Every non-empty document of a (possibly multi-document) manifest file.
fn documents(path: &Path) -> Result<Vec<Value>, SyncError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let mut out = Vec::new();
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = Value::deserialize(document).map_err(|source| SyncError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        if !value.is_null() {
            out.push(value);
        }
    }
    Ok(out)
}

fn is_secret(resource: &Value) -> bool {
    resource.get("kind").and_then(Value::as_str) == Some("Secret")
}

/// Drop `Secret` documents, and `Secret` entries of a `List`'s `items`.
///
/// Returns the documents left and how many secrets were removed. A `List`
/// emptied by the removal is dropped as well.
fn strip_secrets(documents: Vec<Value>) -> (Vec<Value>, usize) {
    let mut kept = Vec::with_capacity(documents.len());
    let mut removed = 0;
    for mut document in documents {
        if is_secret(&document) {
            removed += 1;
            continue;
        }
        if let Some(items) = document.get_mut("items").and_then(Value::as_sequence_mut) {
            let before = items.len();
            items.retain(|item| !is_secret(item));
            let dropped = before - items.len();
            removed += dropped;
            if dropped > 0 && items.is_empty() {
                continue;
            }
        }
        kept.push(document);
    }
    (kept, removed)
}

/// Build the apply plan for `dir`.
pub fn plan(dir: &Path, preserve_secrets: bool) -> Result<ApplyPlan, SyncError> {
    let mut plan = ApplyPlan::default();
    let mut retained = String::new();
    for path in manifest_files(dir)? {
        if !preserve_secrets {
            plan.files.push(path);
            continue;
        }
        let (kept, removed) = strip_secrets(documents(&path)?);
        if removed == 0 {
            plan.files.push(path);
            continue;
        }
        tracing::info!(
            file = %path.display(),
            secrets = removed,
            kept = kept.len(),
            "leaving credential resources out of apply"
        );
        for document in &kept {
            let yaml = serde_yaml::to_string(document).map_err(|source| SyncError::Manifest {
                path: path.clone(),
                source,
            })?;
            retained.push_str("---\n");
            retained.push_str(&yaml);
        }
        plan.excluded.push(path);
    }
    if !retained.is_empty() {
        plan.retained = Some(retained);
    }
    Ok(plan)
}
