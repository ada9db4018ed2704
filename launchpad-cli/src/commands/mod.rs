//! Subcommands and the target/context plumbing they share.

pub mod deploy;
pub mod diff;
pub mod secrets;
pub mod status;
pub mod upload_cache;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use launchpad_core::{state, DeploymentTarget, Settings, TargetOverrides};
use launchpad_renderer::Renderer;
use launchpad_runner::{paths, DeployContext, HostOs, ProcessRunner};

/// Deployment target flags, accepted before or after the subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Cluster API URL, e.g. https://api.cluster.example.com:6443
    #[arg(short = 'a', long, global = true)]
    pub api: Option<String>,

    /// Apps domain; inferred from the API URL when omitted.
    #[arg(short = 'd', long, global = true)]
    pub domain: Option<String>,

    /// Image registry prefix, e.g. quay.io/acme
    #[arg(short = 'r', long, global = true)]
    pub registry: Option<String>,

    /// Target namespace (project).
    #[arg(short = 'n', long, global = true)]
    pub namespace: Option<String>,
}

impl TargetArgs {
    fn overrides(&self) -> TargetOverrides {
        TargetOverrides {
            api: self.api.clone(),
            domain: self.domain.clone(),
            namespace: self.namespace.clone(),
            registry: self.registry.clone(),
        }
    }
}

/// Settings and target resolved once for a working directory.
pub struct Resolved {
    pub workdir: PathBuf,
    pub settings: Settings,
    pub target: DeploymentTarget,
}

pub fn resolve(workdir: &Path, args: &TargetArgs) -> Result<Resolved> {
    let settings = Settings::load_at(workdir).context("failed to load launchpad.yaml")?;
    let saved = state::load_config_at(workdir).context("failed to read .deploy-config")?;
    let target = DeploymentTarget::resolve(&args.overrides(), saved.as_ref(), &settings.project)?;
    Ok(Resolved {
        workdir: workdir.to_path_buf(),
        settings,
        target,
    })
}

/// Embedded templates, overridden by `.launchpad/templates` when present.
pub fn renderer_for(workdir: &Path) -> Result<Renderer> {
    let overrides = paths::templates_dir(workdir);
    let renderer = if overrides.is_dir() {
        Renderer::with_overrides(&overrides)
    } else {
        Renderer::new()
    };
    renderer.context("failed to load manifest templates")
}

pub fn deploy_context(resolved: Resolved) -> Result<DeployContext> {
    let renderer = renderer_for(&resolved.workdir)?;
    Ok(DeployContext {
        workdir: resolved.workdir,
        settings: resolved.settings,
        target: resolved.target,
        runner: Arc::new(ProcessRunner),
        renderer,
        host_os: HostOs::current(),
    })
}

pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
