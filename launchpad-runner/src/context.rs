use std::path::PathBuf;
use std::sync::Arc;

use launchpad_core::{Component, DeploymentTarget, ImageTags, Settings};
use launchpad_renderer::Renderer;

use crate::exec::CommandRunner;
use crate::oc::Oc;
use crate::podman::{HostOs, Podman};

/// Everything a stage needs, resolved once at startup.
///
/// Stages borrow the context; nothing in it changes during a run.
pub struct DeployContext {
    pub workdir: PathBuf,
    pub settings: Settings,
    pub target: DeploymentTarget,
    pub runner: Arc<dyn CommandRunner>,
    pub renderer: Renderer,
    pub host_os: HostOs,
}

impl DeployContext {
    pub fn podman(&self) -> Podman<'_> {
        Podman::new(self.runner.as_ref())
    }

    pub fn oc(&self) -> Oc<'_> {
        Oc::new(self.runner.as_ref(), &self.target.namespace)
    }

    pub fn tags(&self, component: Component) -> ImageTags {
        ImageTags::new(
            &self.target.registry,
            &self.target.project,
            component,
            &self.settings.arch_tag,
        )
    }

    /// Deployment (and service) name of `component`.
    pub fn resource_name(&self, component: Component) -> String {
        component.resource_name(&self.target.project)
    }

    pub fn env_file(&self) -> PathBuf {
        self.workdir.join(&self.settings.env_file)
    }
}
