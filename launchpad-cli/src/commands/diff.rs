//! `launchpad diff` — show unified diffs for the route manifests a deploy would write.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use launchpad_sync::diff_routes;

use super::{renderer_for, resolve, TargetArgs};

/// Arguments for `launchpad diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {}

impl DiffArgs {
    pub fn run(self, workdir: &Path, target: &TargetArgs) -> Result<()> {
        let resolved = resolve(workdir, target)?;
        let renderer = renderer_for(workdir)?;
        let manifest_dir = workdir.join(&resolved.settings.manifest_dir);

        let diffs = diff_routes(&renderer, &resolved.target, &manifest_dir)
            .with_context(|| format!("diff failed for '{}'", manifest_dir.display()))?;

        if diffs.is_empty() {
            println!("No differences for '{}'.", resolved.target.domain);
            return Ok(());
        }

        for diff in diffs {
            print!("{}", diff.unified_diff);
            if !diff.unified_diff.ends_with('\n') {
                println!();
            }
        }

        Ok(())
    }
}
