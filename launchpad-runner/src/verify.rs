//! Post-deploy verification: service endpoints, then a best-effort health probe.

use std::time::Duration;

use futures::future::join_all;

use launchpad_core::{Component, DeploymentTarget};

use crate::context::DeployContext;
use crate::error::RunnerError;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Poll until every service has at least one endpoint.
///
/// Makes `verify_attempts` attempts `verify_interval` apart; on exhaustion
/// dumps diagnostics and fails with the services still lacking endpoints.
pub async fn verify_endpoints(ctx: &DeployContext) -> Result<(), RunnerError> {
    let oc = ctx.oc();
    let timeouts = &ctx.settings.timeouts;
    let attempts = timeouts.verify_attempts.max(1);
    let mut pending: Vec<String> = Component::all().iter().map(|c| ctx.resource_name(*c)).collect();

    for attempt in 1..=attempts {
        let checks = join_all(pending.iter().map(|svc| oc.has_endpoints(svc))).await;
        let mut still_pending = Vec::new();
        for (svc, ready) in pending.into_iter().zip(checks) {
            if !ready? {
                still_pending.push(svc);
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            tracing::info!(attempt, "all services have endpoints");
            return Ok(());
        }
        tracing::debug!(attempt, attempts, pending = ?pending, "waiting for service endpoints");
        if attempt < attempts {
            tokio::time::sleep(timeouts.verify_interval()).await;
        }
    }

    oc.dump_diagnostics().await;
    Err(RunnerError::EndpointsUnavailable {
        services: pending,
        namespace: ctx.target.namespace.clone(),
        attempts,
    })
}

/// `https://<project>-api.<domain>/health`
pub fn health_url(target: &DeploymentTarget) -> String {
    format!(
        "https://{}/health",
        Component::Backend.route_host(&target.project, &target.domain)
    )
}

/// GET `url` on a blocking thread. Returns the HTTP status on success.
pub async fn probe_health(url: String) -> Result<u16, RunnerError> {
    let probe_url = url.clone();
    let result = tokio::task::spawn_blocking(move || {
        let agent = ureq::AgentBuilder::new().timeout(PROBE_TIMEOUT).build();
        agent
            .get(&probe_url)
            .call()
            .map(|response| response.status())
            .map_err(|err| err.to_string())
    })
    .await;

    match result {
        Ok(Ok(status)) => Ok(status),
        Ok(Err(detail)) => Err(RunnerError::HealthProbe { url, detail }),
        Err(err) => Err(RunnerError::Join {
            task: "health_probe",
            detail: err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::*;
    use crate::exec::CommandOutput;
    use crate::fake::{context, ScriptedRunner};

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn endpoints_appearing_late_pass() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on("get endpoints", CommandOutput::ok(""))
            .on("get endpoints", CommandOutput::ok(""))
            .on("get endpoints", CommandOutput::ok(""))
            .on("get endpoints", CommandOutput::ok("10.128.0.12"));
        let ctx = context(dir.path(), runner.clone());

        verify_endpoints(&ctx).await.unwrap();
        assert_eq!(runner.count("get endpoints"), 5);
    }

    #[tokio::test(start_paused = true, flavor = "current_thread")]
    async fn exhausted_attempts_fail_with_diagnostics() {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(ScriptedRunner::new());
        runner
            .on("get endpoints", CommandOutput::ok("10.128.0.12"))
            .on("get endpoints rfe-builder-frontend", CommandOutput::ok(""));
        let ctx = context(dir.path(), runner.clone());

        let started = tokio::time::Instant::now();
        let err = verify_endpoints(&ctx).await.unwrap_err();

        match err {
            RunnerError::EndpointsUnavailable { services, attempts, .. } => {
                assert_eq!(services, vec!["rfe-builder-frontend".to_string()]);
                assert_eq!(attempts, 30);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.count("get endpoints rfe-builder-frontend"), 30);
        assert_eq!(runner.count("get endpoints rfe-builder-backend"), 1);
        assert!(started.elapsed() >= Duration::from_secs(29 * 10));
        assert!(started.elapsed() < Duration::from_secs(30 * 10));
        assert_eq!(runner.count("get events"), 1);
    }

    #[test]
    fn health_url_targets_api_route() {
        let ctx = context(
            std::path::Path::new("/w"),
            Arc::new(ScriptedRunner::new()),
        );
        assert_eq!(
            health_url(&ctx.target),
            "https://rfe-builder-api.apps.c.example.com/health"
        );
    }

    #[tokio::test]
    async fn unreachable_health_endpoint_is_an_error() {
        let err = probe_health("http://127.0.0.1:9/health".to_string())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("127.0.0.1:9"));
    }
}
