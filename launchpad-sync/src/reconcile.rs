//! Reconcile decision — whether the declarative bundle must be re-applied.
//!
//! Decision precedence:
//! 1. `NeverApplied` (no trusted deploy cache)
//! 2. `MissingDeployments` (live cluster lacks an expected deployment; live
//!    state overrides the cache)
//! 3. `TargetChanged` (cached domain, namespace or registry differs)
//! 4. `ConfigChanged` (a manifest file is newer than the last apply)
//! 5. `Current`

use std::fmt;
use std::path::{Path, PathBuf};

use launchpad_core::DeploymentTarget;
use launchpad_detector::freshness;

use crate::bundle;
use crate::deploy_cache::DeployCache;
use crate::error::{io_err, SyncError};

/// Outcome of comparing the deploy cache with the target and live state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileDecision {
    NeverApplied,
    MissingDeployments {
        names: Vec<String>,
    },
    TargetChanged {
        field: &'static str,
        cached: String,
        current: String,
    },
    ConfigChanged {
        files: Vec<PathBuf>,
    },
    Current,
}

impl ReconcileDecision {
    pub fn needs_apply(&self) -> bool {
        !matches!(self, ReconcileDecision::Current)
    }
}

impl fmt::Display for ReconcileDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileDecision::NeverApplied => write!(f, "no previous apply recorded"),
            ReconcileDecision::MissingDeployments { names } => {
                write!(f, "deployment(s) missing in cluster: {}", names.join(", "))
            }
            ReconcileDecision::TargetChanged {
                field,
                cached,
                current,
            } => write!(f, "{field} changed from '{cached}' to '{current}'"),
            ReconcileDecision::ConfigChanged { files } => {
                write!(f, "{} manifest(s) changed: {}", files.len(), preview_files(files))
            }
            ReconcileDecision::Current => write!(f, "configuration up to date"),
        }
    }
}

/// Decide whether to apply.
///
/// `missing_deployments` lists expected deployments the live cluster does
/// not have; the caller queries the cluster.
pub fn decide(
    cache: Option<&DeployCache>,
    missing_deployments: &[String],
    target: &DeploymentTarget,
    manifest_dir: &Path,
) -> Result<ReconcileDecision, SyncError> {
    let Some(cache) = cache else {
        return Ok(ReconcileDecision::NeverApplied);
    };

    if !missing_deployments.is_empty() {
        let mut names = missing_deployments.to_vec();
        names.sort();
        names.dedup();
        return Ok(ReconcileDecision::MissingDeployments { names });
    }

    let fields = [
        ("domain", &cache.domain, &target.domain),
        ("namespace", &cache.namespace, &target.namespace),
        ("registry", &cache.registry, &target.registry),
    ];
    for (field, cached, current) in fields {
        if cached != current {
            return Ok(ReconcileDecision::TargetChanged {
                field,
                cached: cached.clone(),
                current: current.clone(),
            });
        }
    }

    let changed = changed_since(manifest_dir, cache.applied_at)?;
    if !changed.is_empty() {
        return Ok(ReconcileDecision::ConfigChanged { files: changed });
    }

    Ok(ReconcileDecision::Current)
}

/// Manifest files whose mtime is strictly after `since`, relative to `dir`.
pub fn changed_since(dir: &Path, since: i64) -> Result<Vec<PathBuf>, SyncError> {
    let mut changed = Vec::new();
    for path in bundle::manifest_files(dir)? {
        let mtime = freshness::file_mtime(&path)
            .map_err(|e| io_err(&path, e))?
            .unwrap_or(0);
        if mtime > since {
            changed.push(path.strip_prefix(dir).unwrap_or(&path).to_path_buf());
        }
    }
    Ok(changed)
}

fn preview_files(files: &[PathBuf]) -> String {
    const MAX: usize = 3;
    let mut shown: Vec<String> = files
        .iter()
        .take(MAX)
        .map(|p| p.display().to_string())
        .collect();
    if files.len() > MAX {
        shown.push(format!("+{} more", files.len() - MAX));
    }
    shown.join(", ")
}
