//! Detect, build and push stage.
//!
//! Builds of stale components run concurrently and are all joined before
//! anything is pushed. One failed build fails the stage with the first error
//! and nothing is pushed. Pushes (two tags per rebuilt component) also run
//! concurrently.

use futures::future::join_all;
use serde::Serialize;

use launchpad_core::{Component, ImageRef};
use launchpad_detector::{RebuildVerdict, StalenessPolicy};

use crate::context::DeployContext;
use crate::error::RunnerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentVerdict {
    pub component: Component,
    pub verdict: RebuildVerdict,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub rebuilt: Vec<Component>,
    pub up_to_date: Vec<Component>,
    pub pushed: Vec<ImageRef>,
}

/// Evaluate every component against its existing image.
pub async fn detect(
    ctx: &DeployContext,
    policy: &dyn StalenessPolicy,
) -> Result<Vec<ComponentVerdict>, RunnerError> {
    let podman = ctx.podman();
    let images: Vec<(Component, ImageRef)> = Component::all()
        .iter()
        .map(|c| (*c, ctx.tags(*c).arch))
        .collect();
    let stamps = join_all(images.iter().map(|(_, image)| podman.image_stamp(image))).await;

    let mut verdicts = Vec::with_capacity(images.len());
    for ((component, image), stamp) in images.into_iter().zip(stamps) {
        let stamp = stamp?;
        let verdict = policy.evaluate(&ctx.workdir, ctx.settings.sources(component), &stamp);
        tracing::info!(
            component = %component,
            image = %image,
            rebuild = verdict.rebuild,
            "{verdict}"
        );
        verdicts.push(ComponentVerdict { component, verdict });
    }
    Ok(verdicts)
}

/// Build and push every component the verdicts mark stale.
pub async fn build_and_push(
    ctx: &DeployContext,
    verdicts: &[ComponentVerdict],
) -> Result<BuildReport, RunnerError> {
    let mut report = BuildReport::default();
    for v in verdicts {
        if v.verdict.rebuild {
            report.rebuilt.push(v.component);
        } else {
            report.up_to_date.push(v.component);
        }
    }
    if report.rebuilt.is_empty() {
        tracing::info!("all images up to date; nothing to build");
        return Ok(report);
    }

    let podman = ctx.podman();
    let host = ctx.target.registry_host();
    if !podman.logged_in(host).await? {
        return Err(RunnerError::RegistryLogin {
            host: host.to_string(),
        });
    }

    let timeouts = &ctx.settings.timeouts;
    let tags: Vec<_> = report.rebuilt.iter().map(|c| (*c, ctx.tags(*c))).collect();
    let builds = tags.iter().map(|(component, tags)| {
        let podman = &podman;
        async move {
            tracing::info!(component = %component, image = %tags.arch, "building");
            podman
                .build(
                    &ctx.workdir,
                    ctx.settings.sources(*component),
                    tags,
                    &ctx.settings.platform,
                    timeouts.build(),
                )
                .await
        }
    });
    for result in join_all(builds).await {
        result?;
    }

    let images: Vec<ImageRef> = tags
        .iter()
        .flat_map(|(_, t)| t.both().into_iter().cloned())
        .collect();
    let pushes = images.iter().map(|image| {
        tracing::info!(image = %image, "pushing");
        podman.push(image, timeouts.push())
    });
    for result in join_all(pushes).await {
        result?;
    }

    report.pushed = images;
    Ok(report)
}
