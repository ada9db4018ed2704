//! `launchpad deploy` — the full pipeline. Also the default command.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use launchpad_core::Component;
use launchpad_runner::{run_deploy, DeployOptions, DeployReport, UploadResult};

use super::{deploy_context, resolve, runtime, TargetArgs};

/// Arguments for `launchpad deploy`.
#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// Replace live credentials even when they already hold a real token.
    #[arg(long)]
    pub force_secrets: bool,

    /// Skip the HTTP health probe once endpoints are up.
    #[arg(long)]
    pub no_health_probe: bool,
}

impl DeployArgs {
    pub fn run(self, workdir: &Path, target: &TargetArgs) -> Result<()> {
        let ctx = deploy_context(resolve(workdir, target)?)?;
        let options = DeployOptions {
            force_secrets: self.force_secrets,
            health_probe: !self.no_health_probe,
        };

        let report = runtime()?
            .block_on(run_deploy(&ctx, options))
            .with_context(|| format!("deploy to '{}' failed", ctx.target.namespace))?;

        print_summary(&report);
        println!();
        for component in Component::all() {
            println!(
                "  {:<9} https://{}",
                component.to_string(),
                component.route_host(&ctx.target.project, &ctx.target.domain)
            );
        }
        Ok(())
    }
}

fn print_summary(report: &DeployReport) {
    let ok = "✓".green().bold();

    for verdict in &report.verdicts {
        let marker = if verdict.verdict.rebuild {
            "↻".yellow().bold()
        } else {
            ok.clone()
        };
        println!("{marker} {}: {}", verdict.component, verdict.verdict);
    }
    if !report.build.pushed.is_empty() {
        println!("{ok} pushed {} image tag(s)", report.build.pushed.len());
    }

    println!("{ok} secrets: {}", report.secrets.action);
    if !report.secrets.missing_keys.is_empty() {
        println!(
            "{} missing from env file: {}",
            "!".yellow().bold(),
            report.secrets.missing_keys.join(", ")
        );
    }

    if report.apply.applied {
        println!(
            "{ok} applied {} manifest(s): {}",
            report.apply.files.len(),
            report.apply.decision
        );
        if !report.apply.excluded.is_empty() {
            let kept = if report.apply.applied_retained {
                "; their other resources were applied"
            } else {
                ""
            };
            println!(
                "{} live credentials kept: secrets in {} manifest(s) left out{kept}",
                "!".yellow().bold(),
                report.apply.excluded.len()
            );
        }
    } else {
        println!("{ok} apply skipped: {}", report.apply.decision);
    }

    for (deployment, readiness) in &report.readiness.outcomes {
        println!("{ok} {deployment}: {readiness}");
    }

    let cache_marker = match report.cache {
        UploadResult::Failed(_) => "!".yellow().bold(),
        _ => ok.clone(),
    };
    println!("{cache_marker} cache {}", report.cache);
    println!("{ok} all services have endpoints");
}
