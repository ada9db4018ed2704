use std::path::{Path, PathBuf};

pub const DEPLOY_LOG: &str = "deploy.log";

pub fn launchpad_root(workdir: &Path) -> PathBuf {
    workdir.join(".launchpad")
}

pub fn logs_dir(workdir: &Path) -> PathBuf {
    launchpad_root(workdir).join("logs")
}

pub fn deploy_log_path(workdir: &Path) -> PathBuf {
    logs_dir(workdir).join(DEPLOY_LOG)
}

/// Optional per-repository template overrides.
pub fn templates_dir(workdir: &Path) -> PathBuf {
    launchpad_root(workdir).join("templates")
}
