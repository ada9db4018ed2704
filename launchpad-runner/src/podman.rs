//! Container runtime wrapper (podman).

use std::path::Path;
use std::time::Duration;

use launchpad_core::{ComponentSources, ImageRef, ImageTags};
use launchpad_detector::ArtifactStamp;

use crate::error::RunnerError;
use crate::exec::{run_checked, CommandRunner, CommandSpec};

const PODMAN: &str = "podman";

/// Host platform, used to pick the runtime remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostOs {
    MacOs,
    Linux,
    Other,
}

impl HostOs {
    pub fn current() -> Self {
        match std::env::consts::OS {
            "macos" => HostOs::MacOs,
            "linux" => HostOs::Linux,
            _ => HostOs::Other,
        }
    }

    /// Command that starts the runtime service, if one is known.
    fn remediation(&self) -> Option<CommandSpec> {
        match self {
            HostOs::MacOs => Some(CommandSpec::new(PODMAN).args(["machine", "start"])),
            HostOs::Linux => {
                Some(CommandSpec::new("systemctl").args(["--user", "start", "podman.socket"]))
            }
            HostOs::Other => None,
        }
    }

    fn manual_instructions(&self) -> &'static str {
        match self {
            HostOs::MacOs => "run `podman machine init && podman machine start`, then retry",
            HostOs::Linux => "run `systemctl --user start podman.socket` or check `podman info`",
            HostOs::Other => "start the podman service and check `podman info`",
        }
    }
}

pub struct Podman<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Podman<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Creation time of `image` as reported by the local image store.
    ///
    /// A failing inspect means the image does not exist locally.
    pub async fn image_stamp(&self, image: &ImageRef) -> Result<ArtifactStamp, RunnerError> {
        let spec = CommandSpec::new(PODMAN)
            .args(["image", "inspect", "--format", "{{.Created.Unix}}"])
            .arg(image.to_string());
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Ok(ArtifactStamp::Missing);
        }
        Ok(ArtifactStamp::parse(Some(output.stdout.as_str())))
    }

    /// Build `tags` for `platform` from `sources.dockerfile` with `root` as
    /// the build context.
    pub async fn build(
        &self,
        root: &Path,
        sources: &ComponentSources,
        tags: &ImageTags,
        platform: &str,
        timeout: Duration,
    ) -> Result<(), RunnerError> {
        let spec = CommandSpec::new(PODMAN)
            .args(["build", "--platform", platform, "-f"])
            .arg(sources.dockerfile.to_string_lossy())
            .args(["-t".to_string(), tags.arch.to_string()])
            .args(["-t".to_string(), tags.latest.to_string()])
            .arg(".")
            .cwd(root)
            .timeout(timeout);
        let hint = format!(
            "podman build --platform {platform} -f {} .",
            sources.dockerfile.display()
        );
        run_checked(self.runner, &spec, &hint).await?;
        Ok(())
    }

    pub async fn push(&self, image: &ImageRef, timeout: Duration) -> Result<(), RunnerError> {
        let spec = CommandSpec::new(PODMAN)
            .arg("push")
            .arg(image.to_string())
            .timeout(timeout);
        run_checked(self.runner, &spec, &format!("podman push {image}")).await?;
        Ok(())
    }

    pub async fn is_running(&self) -> Result<bool, RunnerError> {
        let spec = CommandSpec::new(PODMAN).arg("info").timeout(Duration::from_secs(60));
        Ok(self.runner.run(&spec).await?.success())
    }

    /// Check the runtime; on failure try one platform-specific start, then
    /// check again.
    pub async fn ensure_running(&self, os: HostOs) -> Result<(), RunnerError> {
        if self.is_running().await? {
            return Ok(());
        }
        let Some(start) = os.remediation() else {
            return Err(RunnerError::RuntimeUnavailable {
                remediation: os.manual_instructions().to_string(),
            });
        };
        tracing::warn!(command = %start.display(), "container runtime not running; attempting to start it");
        let start = start.timeout(Duration::from_secs(180));
        match self.runner.run(&start).await {
            Ok(output) if !output.success() => {
                tracing::warn!(stderr = %output.stderr.trim(), "runtime start command failed")
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "runtime start command could not run"),
        }
        if self.is_running().await? {
            tracing::info!("container runtime started");
            return Ok(());
        }
        Err(RunnerError::RuntimeUnavailable {
            remediation: os.manual_instructions().to_string(),
        })
    }

    /// `true` if credentials for `host` are stored.
    pub async fn logged_in(&self, host: &str) -> Result<bool, RunnerError> {
        let spec = CommandSpec::new(PODMAN).args(["login", "--get-login", host]);
        Ok(self.runner.run(&spec).await?.success())
    }
}
