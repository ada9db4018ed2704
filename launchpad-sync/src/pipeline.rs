//! Reconcile entrypoint shared by `launchpad deploy` and `launchpad diff`.
//!
//! The cluster-facing half (querying deployments, running `oc apply`) lives
//! in the runner; this side decides, renders and selects files.

use std::path::Path;

use launchpad_core::{now_epoch, DeploymentTarget, Settings};
use launchpad_renderer::Renderer;

use crate::bundle::{self, ApplyPlan};
use crate::deploy_cache::{self, DeployCache};
use crate::reconcile::{self, ReconcileDecision};
use crate::secrets::LiveBundle;
use crate::writer::{write_routes, WriteResult};
use crate::SyncError;

/// Everything the runner needs to perform (or skip) an apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedApply {
    pub decision: ReconcileDecision,
    /// Route writes; empty when the decision is `Current`.
    pub writes: Vec<WriteResult>,
    /// Files to apply; `None` when the decision is `Current`.
    pub plan: Option<ApplyPlan>,
}

/// Decide, then on `needs_apply` rewrite the routes and select the bundle.
///
/// The decision is taken before the routes are written so that this run's
/// own writes never count as a config change.
pub fn prepare_apply(
    workdir: &Path,
    settings: &Settings,
    target: &DeploymentTarget,
    renderer: &Renderer,
    missing_deployments: &[String],
    live_bundle: &LiveBundle,
) -> Result<PreparedApply, SyncError> {
    let manifest_dir = workdir.join(&settings.manifest_dir);
    let cache = deploy_cache::load_at(workdir)?;
    let decision = reconcile::decide(cache.as_ref(), missing_deployments, target, &manifest_dir)?;

    if !decision.needs_apply() {
        tracing::info!(decision = %decision, "skipping apply");
        return Ok(PreparedApply {
            decision,
            writes: Vec::new(),
            plan: None,
        });
    }

    tracing::info!(decision = %decision, "apply required");
    let writes = write_routes(renderer, target, &manifest_dir)?;
    let plan = bundle::plan(&manifest_dir, live_bundle.holds_real_token())?;
    Ok(PreparedApply {
        decision,
        writes,
        plan: Some(plan),
    })
}

/// Persist the cache record after a successful apply.
pub fn record_apply(workdir: &Path, target: &DeploymentTarget) -> Result<DeployCache, SyncError> {
    let cache = DeployCache::for_target(target, now_epoch());
    deploy_cache::save_at(workdir, &cache)?;
    Ok(cache)
}
