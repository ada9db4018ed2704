//! `launchpad secrets` — sync the credential bundle without a full deploy.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use launchpad_runner::run_secrets;

use super::{deploy_context, resolve, runtime, TargetArgs};

/// Arguments for `launchpad secrets`.
#[derive(Args, Debug)]
pub struct SecretsArgs {
    /// Replace live credentials even when they already hold a real token.
    #[arg(long)]
    pub force: bool,
}

impl SecretsArgs {
    pub fn run(self, workdir: &Path, target: &TargetArgs) -> Result<()> {
        let ctx = deploy_context(resolve(workdir, target)?)?;
        let report = runtime()?
            .block_on(run_secrets(&ctx, self.force))
            .with_context(|| format!("secret sync for '{}' failed", ctx.settings.secret_name))?;

        println!("{} {}: {}", "✓".green().bold(), ctx.settings.secret_name, report.action);
        for key in &report.missing_keys {
            println!("{} {key} not set in env file; stored empty", "!".yellow().bold());
        }
        Ok(())
    }
}
