//! `launchpad upload-cache` — push the local document cache and vector index.

use std::path::Path;

use anyhow::{bail, Result};
use clap::Args;
use colored::Colorize;

use launchpad_runner::{run_upload_cache, UploadResult};

use super::{deploy_context, resolve, runtime, TargetArgs};

/// Arguments for `launchpad upload-cache`.
#[derive(Args, Debug)]
pub struct UploadCacheArgs {}

impl UploadCacheArgs {
    pub fn run(self, workdir: &Path, target: &TargetArgs) -> Result<()> {
        let ctx = deploy_context(resolve(workdir, target)?)?;
        let result = runtime()?.block_on(run_upload_cache(&ctx))?;

        // Unlike inside a deploy, a failed upload is the command's own failure.
        if let UploadResult::Failed(reason) = result {
            bail!("cache upload failed: {reason}");
        }
        println!("{} cache {result}", "✓".green().bold());
        Ok(())
    }
}
