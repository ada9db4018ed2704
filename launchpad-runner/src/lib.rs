//! # launchpad-runner
//!
//! Async deploy pipeline. Every external tool call goes through the
//! [`CommandRunner`] seam; stages borrow one immutable [`DeployContext`].
//!
//! ```text
//! preflight → detect → build/push → secrets → reconcile → readiness → cache upload → verify
//! ```

pub mod apply;
pub mod build;
pub mod cache_upload;
pub mod context;
pub mod error;
pub mod exec;
pub mod logging;
pub mod oc;
pub mod paths;
pub mod pipeline;
pub mod podman;
pub mod preflight;
pub mod readiness;
pub mod secrets;
pub mod verify;

#[cfg(test)]
mod fake;

pub use apply::ApplyReport;
pub use build::{BuildReport, ComponentVerdict};
pub use cache_upload::UploadResult;
pub use context::DeployContext;
pub use error::RunnerError;
pub use exec::{CommandOutput, CommandRunner, CommandSpec, ProcessRunner};
pub use logging::{init_tracing, LogOptions};
pub use pipeline::{run_deploy, run_secrets, run_upload_cache, DeployOptions, DeployReport};
pub use podman::HostOs;
pub use readiness::{Readiness, ReadinessReport};
pub use secrets::SecretReport;
