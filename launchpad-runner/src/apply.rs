//! Reconcile stage: decide, write routes, apply the bundle, record the apply.

use std::path::PathBuf;

use futures::future::join_all;

use launchpad_core::Component;
use launchpad_sync::{prepare_apply, record_apply, ReconcileDecision};

use crate::context::DeployContext;
use crate::error::RunnerError;
use crate::secrets::live_bundle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub decision: ReconcileDecision,
    pub applied: bool,
    pub files: Vec<PathBuf>,
    /// Manifests whose secrets were left out to preserve live credentials.
    pub excluded: Vec<PathBuf>,
    /// Whether the non-secret documents of those manifests were applied.
    pub applied_retained: bool,
}

/// Expected deployments that do not exist in the cluster.
pub async fn missing_deployments(ctx: &DeployContext) -> Result<Vec<String>, RunnerError> {
    let oc = ctx.oc();
    let names: Vec<String> = Component::all().iter().map(|c| ctx.resource_name(*c)).collect();
    let found = join_all(names.iter().map(|name| oc.deployment_exists(name))).await;

    let mut missing = Vec::new();
    for (name, exists) in names.into_iter().zip(found) {
        if !exists? {
            missing.push(name);
        }
    }
    Ok(missing)
}

pub async fn reconcile(ctx: &DeployContext) -> Result<ApplyReport, RunnerError> {
    let oc = ctx.oc();
    let missing = missing_deployments(ctx).await?;
    let live = live_bundle(&oc, &ctx.settings.secret_name).await?;

    let prepared = prepare_apply(
        &ctx.workdir,
        &ctx.settings,
        &ctx.target,
        &ctx.renderer,
        &missing,
        &live,
    )?;
    let Some(plan) = prepared.plan else {
        return Ok(ApplyReport {
            decision: prepared.decision,
            applied: false,
            files: Vec::new(),
            excluded: Vec::new(),
            applied_retained: false,
        });
    };

    for write in prepared.writes.iter().filter(|w| w.changed()) {
        tracing::info!(path = %write.path().display(), "route manifest updated");
    }
    if !plan.excluded.is_empty() {
        tracing::info!(
            excluded = ?plan.excluded,
            "live credentials hold a real token; secrets left out of the apply"
        );
    }

    oc.apply_files(&plan.files).await?;
    let applied_retained = plan.retained.is_some();
    if let Some(stream) = plan.retained {
        oc.apply_documents(stream).await?;
    }
    let cache = record_apply(&ctx.workdir, &ctx.target)?;
    tracing::info!(files = plan.files.len(), applied_at = cache.applied_at, "bundle applied");

    Ok(ApplyReport {
        decision: prepared.decision,
        applied: true,
        files: plan.files,
        excluded: plan.excluded,
        applied_retained,
    })
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    use super::*;
    use crate::exec::CommandOutput;
    use crate::fake::{context, ScriptedRunner};

    const PLACEHOLDER_SECRET: &str = "apiVersion: v1\nkind: Secret\nmetadata:\n  name: rfe-builder-secrets\nstringData:\n  jira-personal-token: your-jira-token-here\n";
    const DEPLOYMENT: &str = "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: rfe-builder-backend\n";

    fn workdir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let manifests = dir.path().join("openshift");
        fs::create_dir_all(&manifests).unwrap();
        for (name, body) in [("deployment.yaml", DEPLOYMENT), ("secrets.yaml", PLACEHOLDER_SECRET)] {
            let path = manifests.join(name);
            fs::write(&path, body).unwrap();
            set_file_mtime(&path, FileTime::from_unix_time(1_000, 0)).unwrap();
        }
        dir
    }

    fn applied_files(runner: &ScriptedRunner) -> Vec<String> {
        runner
            .calls()
            .into_iter()
            .filter(|c| c.contains(" apply -f ") && !c.ends_with("apply -f -"))
            .collect()
    }

    #[tokio::test]
    async fn second_run_without_changes_applies_nothing() {
        let dir = workdir();
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("get deployment", CommandOutput::failed(1, "NotFound"));
        let ctx = context(dir.path(), runner.clone());

        let first = reconcile(&ctx).await.unwrap();
        assert!(first.applied);
        assert_eq!(first.decision, ReconcileDecision::NeverApplied);
        assert_eq!(applied_files(&runner).len(), 1);

        runner.on("get deployment rfe-builder", CommandOutput::ok("deployment.apps/x"));
        let second = reconcile(&ctx).await.unwrap();
        assert!(!second.applied);
        assert_eq!(second.decision, ReconcileDecision::Current);
        assert_eq!(applied_files(&runner).len(), 1);
    }

    #[tokio::test]
    async fn real_live_token_excludes_secret_manifests() {
        let dir = workdir();
        let runner = Arc::new(ScriptedRunner::new());
        // base64("real-token")
        runner.on("get secret", CommandOutput::ok("cmVhbC10b2tlbg=="));
        let ctx = context(dir.path(), runner.clone());

        let report = reconcile(&ctx).await.unwrap();

        assert!(report.applied);
        assert_eq!(report.excluded.len(), 1);
        let apply = &applied_files(&runner)[0];
        assert!(apply.contains("deployment.yaml"));
        assert!(apply.contains("route-frontend.yaml"));
        assert!(!apply.contains("secrets.yaml"));
    }

    #[tokio::test]
    async fn preserved_secret_still_applies_its_neighbours() {
        let dir = TempDir::new().unwrap();
        let manifests = dir.path().join("openshift");
        fs::create_dir_all(&manifests).unwrap();
        fs::write(
            manifests.join("app.yaml"),
            format!("{DEPLOYMENT}---\n{PLACEHOLDER_SECRET}"),
        )
        .unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("get deployment", CommandOutput::failed(1, "NotFound"));
        runner.on("get secret", CommandOutput::ok("cmVhbC10b2tlbg=="));
        let ctx = context(dir.path(), runner.clone());

        let report = reconcile(&ctx).await.unwrap();

        assert!(report.applied);
        assert!(report.applied_retained);
        assert_eq!(report.excluded, vec![manifests.join("app.yaml")]);
        assert!(!applied_files(&runner)[0].contains("app.yaml"));
        let streamed: Vec<String> = runner
            .specs()
            .into_iter()
            .filter(|s| s.display().ends_with("apply -f -"))
            .filter_map(|s| s.stdin)
            .collect();
        assert_eq!(streamed.len(), 1);
        assert!(streamed[0].contains("kind: Deployment"));
        assert!(streamed[0].contains("name: rfe-builder-backend"));
        assert!(!streamed[0].contains("kind: Secret"));
    }

    #[tokio::test]
    async fn missing_deployment_forces_apply_despite_cache() {
        let dir = workdir();
        let runner = Arc::new(ScriptedRunner::new());
        let ctx = context(dir.path(), runner.clone());
        reconcile(&ctx).await.unwrap();

        runner.on(
            "get deployment rfe-builder-backend",
            CommandOutput::failed(1, "NotFound"),
        );
        let report = reconcile(&ctx).await.unwrap();

        assert_eq!(
            report.decision,
            ReconcileDecision::MissingDeployments {
                names: vec!["rfe-builder-backend".to_string()]
            }
        );
        assert!(report.applied);
    }

    #[tokio::test]
    async fn failed_apply_records_nothing() {
        let dir = workdir();
        let runner = Arc::new(ScriptedRunner::new());
        runner.on("apply -f /", CommandOutput::failed(1, "admission webhook denied"));
        let ctx = context(dir.path(), runner.clone());

        let err = reconcile(&ctx).await.unwrap_err();

        assert!(err.to_string().contains("oc get events -n rfe"));
        assert!(!launchpad_sync::deploy_cache::cache_path_at(dir.path()).exists());
    }
}
