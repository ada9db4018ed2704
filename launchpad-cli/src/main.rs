//! Launchpad — build, deploy and verify the application on an OpenShift cluster.
//!
//! # Usage
//!
//! ```text
//! launchpad [-a <api>] [-d <domain>] [-r <registry>] [-n <namespace>]      # full deploy
//! launchpad deploy [--force-secrets] [--no-health-probe]
//! launchpad status [--json]
//! launchpad diff
//! launchpad secrets [--force]
//! launchpad upload-cache
//! ```
//!
//! Flags not given fall back to the values saved by the previous successful
//! run in `.deploy-config`, then to built-in defaults.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{
    deploy::DeployArgs, diff::DiffArgs, secrets::SecretsArgs, status::StatusArgs,
    upload_cache::UploadCacheArgs, TargetArgs,
};
use launchpad_runner::{init_tracing, paths, LogOptions};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "launchpad",
    version,
    about = "Build, deploy and verify the application on an OpenShift cluster",
    long_about = None,
)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    /// Debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Defaults to `deploy`.
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the whole pipeline: build, push, secrets, apply, wait, upload cache, verify.
    Deploy(DeployArgs),

    /// Show the resolved target, the last apply and local freshness.
    Status(StatusArgs),

    /// Show how the route manifests would change for the current target.
    Diff(DiffArgs),

    /// Sync the credential bundle from the local env file only.
    Secrets(SecretsArgs),

    /// Upload the precomputed cache only, if it is newer than the remote copy.
    UploadCache(UploadCacheArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Commands::Deploy(DeployArgs::default()));

    let workdir = std::env::current_dir().context("could not determine working directory")?;
    let file = matches!(command, Commands::Deploy(_)).then(|| paths::deploy_log_path(&workdir));
    init_tracing(&LogOptions {
        verbose: cli.verbose,
        json: cli.log_json,
        file,
    })
    .context("failed to initialise logging")?;

    match command {
        Commands::Deploy(args) => args.run(&workdir, &cli.target),
        Commands::Status(args) => args.run(&workdir, &cli.target),
        Commands::Diff(args) => args.run(&workdir, &cli.target),
        Commands::Secrets(args) => args.run(&workdir, &cli.target),
        Commands::UploadCache(args) => args.run(&workdir, &cli.target),
    }
}
