//! Checks run before any stage touches the registry or the cluster.

use launchpad_core::ConfigError;

use crate::context::DeployContext;
use crate::error::RunnerError;

/// The credential file must exist before anything else runs.
pub fn check_env_file(ctx: &DeployContext) -> Result<(), RunnerError> {
    let path = ctx.env_file();
    if !path.is_file() {
        return Err(ConfigError::MissingEnvFile { path }.into());
    }
    Ok(())
}

pub async fn check_runtime(ctx: &DeployContext) -> Result<(), RunnerError> {
    ctx.podman().ensure_running(ctx.host_os).await
}

/// Cluster login, then make sure the namespace exists.
pub async fn check_cluster(ctx: &DeployContext) -> Result<(), RunnerError> {
    let oc = ctx.oc();
    let Some(user) = oc.whoami().await? else {
        return Err(RunnerError::ClusterLogin {
            api: ctx.target.api.clone(),
        });
    };
    tracing::info!(user = %user, api = %ctx.target.api, "cluster session ok");
    if oc.ensure_project().await? {
        tracing::info!(namespace = %ctx.target.namespace, "created namespace");
    }
    Ok(())
}

/// Every check a full deploy needs, in order.
pub async fn run_all(ctx: &DeployContext) -> Result<(), RunnerError> {
    check_env_file(ctx)?;
    check_runtime(ctx).await?;
    check_cluster(ctx).await
}
