//! Stage sequencing.
//!
//! Stages run strictly in order:
//!   preflight → detect → build/push → secrets → reconcile → readiness →
//!   cache upload → verify
//! The first failing stage ends the run. The cache upload is the only stage
//! whose failure is reported and then ignored.

use std::future::Future;
use std::time::Instant;

use launchpad_core::state::{save_config_at, SavedConfig};
use launchpad_detector::MtimePolicy;

use crate::apply::{self, ApplyReport};
use crate::build::{self, BuildReport, ComponentVerdict};
use crate::cache_upload::{upload_cache_if_stale, UploadResult};
use crate::context::DeployContext;
use crate::error::RunnerError;
use crate::preflight;
use crate::readiness::{self, ReadinessReport};
use crate::secrets::{self, SecretReport};
use crate::verify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeployOptions {
    /// Replace a live credential bundle even if it holds a real token.
    pub force_secrets: bool,
    /// Probe the API health route after endpoints exist.
    pub health_probe: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            force_secrets: false,
            health_probe: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployReport {
    pub verdicts: Vec<ComponentVerdict>,
    pub build: BuildReport,
    pub secrets: SecretReport,
    pub apply: ApplyReport,
    pub readiness: ReadinessReport,
    pub cache: UploadResult,
}

async fn timed<T, F>(stage: &'static str, fut: F) -> Result<T, RunnerError>
where
    F: Future<Output = Result<T, RunnerError>>,
{
    let started = Instant::now();
    tracing::info!(stage, "stage started");
    let result = fut.await;
    let duration_ms = started.elapsed().as_millis() as u64;
    match &result {
        Ok(_) => tracing::info!(stage, duration_ms, "stage finished"),
        Err(err) => tracing::error!(stage, duration_ms, error = %err, "stage failed"),
    }
    result
}

/// Full deploy. Saves `.deploy-config` only when every stage succeeded.
pub async fn run_deploy(ctx: &DeployContext, options: DeployOptions) -> Result<DeployReport, RunnerError> {
    tracing::info!(
        api = %ctx.target.api,
        domain = %ctx.target.domain,
        namespace = %ctx.target.namespace,
        registry = %ctx.target.registry,
        "deploying {}",
        ctx.target.project
    );

    timed("preflight", preflight::run_all(ctx)).await?;
    let verdicts = timed("detect", build::detect(ctx, &MtimePolicy)).await?;
    let build = timed("build", build::build_and_push(ctx, &verdicts)).await?;
    let secrets = timed("secrets", secrets::sync_secrets(ctx, options.force_secrets)).await?;
    let apply = timed("reconcile", apply::reconcile(ctx)).await?;
    let readiness = timed("readiness", readiness::await_all(ctx)).await?;
    let cache = timed("cache_upload", async { Ok(upload_cache_if_stale(ctx).await) }).await?;
    timed("verify", verify::verify_endpoints(ctx)).await?;

    if options.health_probe {
        let url = verify::health_url(&ctx.target);
        match verify::probe_health(url.clone()).await {
            Ok(status) => tracing::info!(url = %url, status, "health probe ok"),
            Err(err) => tracing::warn!(error = %err, "health probe failed; deployment is up but may not be serving"),
        }
    }

    save_config_at(&ctx.workdir, &SavedConfig::from(&ctx.target))?;
    tracing::info!(
        frontend = %launchpad_core::Component::Frontend.route_host(&ctx.target.project, &ctx.target.domain),
        backend = %launchpad_core::Component::Backend.route_host(&ctx.target.project, &ctx.target.domain),
        "deploy complete"
    );

    Ok(DeployReport {
        verdicts,
        build,
        secrets,
        apply,
        readiness,
        cache,
    })
}

/// Secret stage on its own, for `launchpad secrets`.
pub async fn run_secrets(ctx: &DeployContext, force: bool) -> Result<SecretReport, RunnerError> {
    preflight::check_env_file(ctx)?;
    timed("preflight", preflight::check_cluster(ctx)).await?;
    timed("secrets", secrets::sync_secrets(ctx, force)).await
}

/// Cache stage on its own, for `launchpad upload-cache`.
pub async fn run_upload_cache(ctx: &DeployContext) -> Result<UploadResult, RunnerError> {
    timed("preflight", preflight::check_cluster(ctx)).await?;
    timed("cache_upload", async { Ok(upload_cache_if_stale(ctx).await) }).await
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;
    use std::sync::Arc;

    use filetime::{set_file_mtime, FileTime};
    use launchpad_core::Component;
    use launchpad_sync::{ReconcileDecision, SecretAction};
    use tempfile::TempDir;

    use super::*;
    use crate::exec::CommandOutput;
    use crate::fake::{context, ScriptedRunner};
    use crate::readiness::Readiness;

    const OLD: i64 = 1_000;
    const IMAGE_CREATED: &str = "1500";
    const CHANGED: i64 = 2_000;
    const NOT_FOUND: &str = "Error from server (NotFound): not found";
    const ONE_POD: &str = r#"{"items":[{"metadata":{"name":"rfe-builder-backend-5c4b","creationTimestamp":"2024-06-10T08:00:00Z"},"status":{"conditions":[{"type":"Ready","status":"True"}]}}]}"#;
    const REPLACED_POD: &str = r#"{"items":[{"metadata":{"name":"rfe-builder-backend-6d1e","creationTimestamp":"2024-06-10T09:00:00Z"},"status":{"conditions":[{"type":"Ready","status":"True"}]}}]}"#;

    fn touch(path: &Path, body: &str, mtime: i64) {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).unwrap();
        }
        fs::write(path, body).unwrap();
        set_file_mtime(path, FileTime::from_unix_time(mtime, 0)).unwrap();
    }

    /// Sources older than both images except the frontend Dockerfile, a
    /// manifest bundle with a placeholder secret, and a local cache.
    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::write(
            root.join(".env"),
            "JIRA_URL=https://issues.example.com\nJIRA_PERSONAL_TOKEN=real-token\n",
        )
        .unwrap();
        for file in [
            "Dockerfile.api",
            "requirements.txt",
            "pm_chatbot_main.py",
            "api_server.py",
            "auth.py",
            "rfe_manager.py",
        ] {
            touch(&root.join(file), "x", OLD);
        }
        touch(&root.join("Dockerfile.frontend"), "FROM python:3.11", CHANGED);
        touch(
            &root.join("openshift/deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: rfe-builder-backend\n",
            OLD,
        );
        touch(
            &root.join("openshift/secrets.yaml"),
            "apiVersion: v1\nkind: Secret\nmetadata:\n  name: rfe-builder-secrets\n",
            OLD,
        );
        touch(&root.join("document_cache/chunks.json"), "[]", CHANGED);
        touch(&root.join("vector_db/metadata.json"), "{}", CHANGED);
        dir
    }

    fn scripted_cluster() -> Arc<ScriptedRunner> {
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on("oc whoami", CommandOutput::ok("developer\n"))
            .on("image inspect", CommandOutput::ok(IMAGE_CREATED))
            // Absent before the first secret apply, then holding the real token.
            .on("get secret", CommandOutput::failed(1, NOT_FOUND))
            .on("get secret", CommandOutput::ok("cmVhbC10b2tlbg=="))
            // Both deployments are absent until the bundle is applied.
            .on("get deployment", CommandOutput::failed(1, NOT_FOUND))
            .on("get deployment", CommandOutput::failed(1, NOT_FOUND))
            .on("get deployment", CommandOutput::ok("deployment.apps/x"))
            .on("get pods -l", CommandOutput::ok(ONE_POD))
            .on("get pods -l", CommandOutput::ok(REPLACED_POD))
            .on("stat -c %Y", CommandOutput::failed(1, "No such file or directory"))
            .on("get endpoints", CommandOutput::ok("10.128.0.12"));
        runner
    }

    fn options() -> DeployOptions {
        DeployOptions {
            health_probe: false,
            ..DeployOptions::default()
        }
    }

    #[tokio::test]
    async fn fresh_environment_with_one_changed_component() {
        let dir = project();
        let runner = scripted_cluster();
        let ctx = context(dir.path(), runner.clone());

        let report = run_deploy(&ctx, options()).await.unwrap();

        assert_eq!(report.build.rebuilt, vec![Component::Frontend]);
        assert_eq!(report.build.up_to_date, vec![Component::Backend]);
        assert_eq!(runner.count("podman build"), 1);
        assert_eq!(runner.count("-f Dockerfile.frontend"), 1);
        assert_eq!(runner.count("podman push quay.io/acme/rfe-builder-frontend"), 2);
        assert_eq!(runner.count("podman push quay.io/acme/rfe-builder-backend"), 0);

        assert_eq!(report.secrets.action, SecretAction::Create);
        assert_eq!(report.apply.decision, ReconcileDecision::NeverApplied);
        assert!(report.apply.applied);
        let applies: Vec<String> = runner
            .calls()
            .into_iter()
            .filter(|c| c.contains(" apply -f /"))
            .collect();
        assert_eq!(applies.len(), 1);
        assert!(applies[0].contains("deployment.yaml"));
        assert!(!applies[0].contains("secrets.yaml"));

        assert!(report.readiness.outcomes.iter().all(|(_, r)| *r == Readiness::Ready));
        assert_eq!(report.cache, UploadResult::Uploaded { restarted: true });
        assert_eq!(runner.count("rollout restart"), 1);
        assert_eq!(runner.count("condition=Ready pod/rfe-builder-backend-6d1e"), 1);
        assert!(runner.count("get endpoints") <= 2 * 30);

        assert!(dir.path().join(".deploy-config").exists());
        assert!(dir.path().join(".deploy-cache").exists());
    }

    #[tokio::test]
    async fn second_run_applies_nothing_and_preserves_secret() {
        let dir = project();
        let ctx = context(dir.path(), scripted_cluster());
        run_deploy(&ctx, options()).await.unwrap();

        let runner = scripted_cluster();
        runner
            .on("image inspect --format", CommandOutput::ok("4102444800"))
            .on("get secret rfe-builder-secrets", CommandOutput::ok("cmVhbC10b2tlbg=="))
            .on("get deployment rfe-builder", CommandOutput::ok("deployment.apps/x"))
            .on("-- stat -c %Y", CommandOutput::ok("4102444800"));
        let ctx = context(dir.path(), runner.clone());
        let report = run_deploy(&ctx, options()).await.unwrap();

        assert!(report.build.rebuilt.is_empty());
        assert_eq!(report.secrets.action, SecretAction::Preserve);
        assert_eq!(report.apply.decision, ReconcileDecision::Current);
        assert_eq!(report.cache, UploadResult::Skipped("remote up to date".to_string()));
        assert_eq!(runner.count(" apply "), 0);
        assert_eq!(runner.count("podman build"), 0);
    }

    #[tokio::test]
    async fn build_failure_stops_before_push_and_cluster_changes() {
        let dir = project();
        let runner = scripted_cluster();
        runner.on("podman build", CommandOutput::failed(1, "error building at STEP"));
        let ctx = context(dir.path(), runner.clone());

        let err = run_deploy(&ctx, options()).await.unwrap_err();

        assert!(err.to_string().contains("error building at STEP"));
        assert_eq!(runner.count("podman push"), 0);
        assert_eq!(runner.count(" apply "), 0);
        assert!(!dir.path().join(".deploy-config").exists());
    }

    #[tokio::test]
    async fn missing_env_file_fails_before_any_command() {
        let dir = project();
        fs::remove_file(dir.path().join(".env")).unwrap();
        let runner = scripted_cluster();
        let ctx = context(dir.path(), runner.clone());

        let err = run_deploy(&ctx, options()).await.unwrap_err();

        assert!(matches!(
            err,
            RunnerError::Config(launchpad_core::ConfigError::MissingEnvFile { .. })
        ));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn cache_failure_does_not_fail_the_deploy() {
        let dir = project();
        let runner = scripted_cluster();
        runner.on(" cp ", CommandOutput::failed(1, "error: unexpected EOF"));
        let ctx = context(dir.path(), runner.clone());

        let report = run_deploy(&ctx, options()).await.unwrap();

        assert!(matches!(report.cache, UploadResult::Failed(_)));
        assert!(runner.count("get endpoints") >= 2);
    }

    #[tokio::test]
    async fn not_logged_in_names_login_command() {
        let dir = project();
        let runner = scripted_cluster();
        runner.on("whoami", CommandOutput::failed(1, "Unauthorized"));
        let ctx = context(dir.path(), runner.clone());

        let err = run_secrets(&ctx, false).await.unwrap_err();

        assert!(err.to_string().contains("oc login https://api.c.example.com:6443"));
        assert_eq!(runner.count("get secret"), 0);
    }
}
