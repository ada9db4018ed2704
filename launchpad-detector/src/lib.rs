//! Change detection for `launchpad-detector`.
//!
//! Decides whether a component's container image must be rebuilt by comparing
//! the image's creation time against the modification times of the files the
//! image is built from. Ambiguity always resolves to "rebuild":
//!
//! 1. No image → rebuild.
//! 2. Image creation time not an epoch integer → rebuild.
//! 3. A tracked file cannot be inspected → rebuild.
//! 4. Newest tracked mtime > creation time → rebuild.
//! 5. Otherwise up to date.
//!
//! Missing tracked files contribute a timestamp of zero.
//!
//! The rule set lives behind [`StalenessPolicy`] so a content-hash based
//! policy can replace [`MtimePolicy`] without touching the build stage.

pub mod freshness;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use launchpad_core::ComponentSources;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// What the image tool reported about an existing artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum ArtifactStamp {
    /// No image exists under the expected tag.
    Missing,
    /// The tool printed something that is not an epoch integer.
    Unparsable(String),
    /// Creation time in epoch seconds.
    CreatedAt(i64),
}

impl ArtifactStamp {
    /// Interpret raw tool output. `None` means the image lookup failed.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return ArtifactStamp::Missing;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return ArtifactStamp::Missing;
        }
        match trimmed.parse::<i64>() {
            Ok(secs) if secs > 0 => ArtifactStamp::CreatedAt(secs),
            _ => ArtifactStamp::Unparsable(trimmed.to_string()),
        }
    }
}

/// Why a verdict was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RebuildReason {
    ImageMissing,
    UnparsableTimestamp { raw: String },
    UnreadableSource { path: PathBuf },
    SourceNewer { path: PathBuf, mtime: i64, created: i64 },
    UpToDate { newest: i64, created: i64 },
}

/// Outcome of a staleness evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildVerdict {
    pub rebuild: bool,
    pub reason: RebuildReason,
}

impl RebuildVerdict {
    fn rebuild(reason: RebuildReason) -> Self {
        Self {
            rebuild: true,
            reason,
        }
    }
}

impl fmt::Display for RebuildVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RebuildReason::ImageMissing => write!(f, "no existing image"),
            RebuildReason::UnparsableTimestamp { raw } => {
                write!(f, "image creation time unparsable ({raw:?})")
            }
            RebuildReason::UnreadableSource { path } => {
                write!(f, "cannot inspect {}", path.display())
            }
            RebuildReason::SourceNewer { path, .. } => {
                write!(f, "{} changed since last build", path.display())
            }
            RebuildReason::UpToDate { .. } => write!(f, "up to date"),
        }
    }
}

/// Strategy deciding whether an artifact is stale.
pub trait StalenessPolicy: Send + Sync {
    fn evaluate(&self, root: &Path, sources: &ComponentSources, stamp: &ArtifactStamp)
        -> RebuildVerdict;
}

/// Modification-time based policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct MtimePolicy;

impl StalenessPolicy for MtimePolicy {
    fn evaluate(
        &self,
        root: &Path,
        sources: &ComponentSources,
        stamp: &ArtifactStamp,
    ) -> RebuildVerdict {
        let created = match stamp {
            ArtifactStamp::Missing => return RebuildVerdict::rebuild(RebuildReason::ImageMissing),
            ArtifactStamp::Unparsable(raw) => {
                return RebuildVerdict::rebuild(RebuildReason::UnparsableTimestamp {
                    raw: raw.clone(),
                })
            }
            ArtifactStamp::CreatedAt(secs) => *secs,
        };

        let newest = match newest_input(root, sources) {
            Ok(newest) => newest,
            Err(path) => return RebuildVerdict::rebuild(RebuildReason::UnreadableSource { path }),
        };

        match newest {
            Some((path, mtime)) if mtime > created => {
                RebuildVerdict::rebuild(RebuildReason::SourceNewer {
                    path,
                    mtime,
                    created,
                })
            }
            other => RebuildVerdict {
                rebuild: false,
                reason: RebuildReason::UpToDate {
                    newest: other.map(|(_, m)| m).unwrap_or(0),
                    created,
                },
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `true` if the component must be rebuilt under the default [`MtimePolicy`].
pub fn needs_rebuild(root: &Path, sources: &ComponentSources, stamp: &ArtifactStamp) -> bool {
    MtimePolicy.evaluate(root, sources, stamp).rebuild
}

/// Every file whose mtime feeds the decision: dockerfile, dependency
/// manifest, then the tracked sources. Paths are relative to the build root.
pub fn tracked_files(sources: &ComponentSources) -> Vec<&Path> {
    let mut files = vec![sources.dockerfile.as_path(), sources.manifest.as_path()];
    files.extend(sources.sources.iter().map(PathBuf::as_path));
    files
}

/// Newest `(path, mtime)` across the tracked files. Missing files count as
/// zero. Returns the offending path if any file cannot be inspected.
pub fn newest_input(
    root: &Path,
    sources: &ComponentSources,
) -> Result<Option<(PathBuf, i64)>, PathBuf> {
    let mut newest: Option<(PathBuf, i64)> = None;
    for rel in tracked_files(sources) {
        let path = root.join(rel);
        let mtime = freshness::file_mtime(&path)
            .map_err(|_| rel.to_path_buf())?
            .unwrap_or(0);
        if newest.as_ref().map_or(true, |(_, n)| mtime > *n) {
            newest = Some((rel.to_path_buf(), mtime));
        }
    }
    Ok(newest)
}
