use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Error surface for the deploy pipeline.
///
/// Every cluster- or runtime-facing variant names the failed check and the
/// next command an operator should run.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("could not start `{program}`: {source}\n  hint: make sure `{program}` is installed and on PATH")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}\n  hint: {hint}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
        hint: String,
    },

    #[error("`{command}` did not finish within {}s\n  hint: {hint}", .after.as_secs())]
    CommandTimeout {
        command: String,
        after: Duration,
        hint: String,
    },

    #[error("container runtime is not running and could not be started\n  hint: {remediation}")]
    RuntimeUnavailable { remediation: String },

    #[error("not logged in to registry {host}\n  hint: podman login {host}")]
    RegistryLogin { host: String },

    #[error("not logged in to cluster\n  hint: oc login {api}")]
    ClusterLogin { api: String },

    #[error("deployment(s) not ready within {}s: {}\n  hint: oc get pods -n {namespace}", .after.as_secs(), .deployments.join(", "))]
    RolloutTimeout {
        deployments: Vec<String>,
        namespace: String,
        after: Duration,
    },

    #[error("service(s) have no endpoints after {attempts} attempts: {}\n  hint: oc get endpoints -n {namespace}", .services.join(", "))]
    EndpointsUnavailable {
        services: Vec<String>,
        namespace: String,
        attempts: u32,
    },

    #[error("health probe of {url} failed: {detail}\n  hint: curl -k {url}")]
    HealthProbe { url: String, detail: String },

    #[error("unexpected `{command}` output: {detail}")]
    Parse { command: String, detail: String },

    #[error("{task} task join failure: {detail}")]
    Join { task: &'static str, detail: String },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] launchpad_core::ConfigError),

    #[error(transparent)]
    State(#[from] launchpad_core::StateError),

    #[error("render error: {0}")]
    Render(#[from] launchpad_renderer::RenderError),

    #[error("sync error: {0}")]
    Sync(#[from] launchpad_sync::SyncError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunnerError {
    RunnerError::Io {
        path: path.into(),
        source,
    }
}
