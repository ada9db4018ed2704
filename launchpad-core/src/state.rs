//! Persisted last-used deployment settings (`.deploy-config`).
//!
//! # Storage layout
//!
//! ```text
//! <workdir>/
//!   .deploy-config   (API/DOMAIN/NAMESPACE/PROJECT/REGISTRY — mode 0600)
//! ```
//!
//! Written at the end of every successful run; read at startup to default
//! any flag the user did not pass.
//!
//! # API pattern
//!
//! Every function takes the working directory explicitly so tests can point
//! it at a `TempDir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::envfile;
use crate::error::StateError;
use crate::target::DeploymentTarget;

pub const CONFIG_FILE: &str = ".deploy-config";

/// Last-used target values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedConfig {
    pub api: String,
    pub domain: String,
    pub namespace: String,
    pub project: String,
    pub registry: String,
}

impl From<&DeploymentTarget> for SavedConfig {
    fn from(t: &DeploymentTarget) -> Self {
        Self {
            api: t.api.clone(),
            domain: t.domain.clone(),
            namespace: t.namespace.clone(),
            project: t.project.clone(),
            registry: t.registry.clone(),
        }
    }
}

/// `<workdir>/.deploy-config`. Pure, no I/O.
pub fn config_path_at(workdir: &Path) -> PathBuf {
    workdir.join(CONFIG_FILE)
}

/// Load the saved config, or `None` if no previous run stored one.
pub fn load_config_at(workdir: &Path) -> Result<Option<SavedConfig>, StateError> {
    let path = config_path_at(workdir);
    let Some(map) = envfile::load_optional(&path)? else {
        return Ok(None);
    };
    let get = |key: &str| map.get(key).cloned().unwrap_or_default();
    Ok(Some(SavedConfig {
        api: get("API"),
        domain: get("DOMAIN"),
        namespace: get("NAMESPACE"),
        project: get("PROJECT"),
        registry: get("REGISTRY"),
    }))
}

/// Atomically persist `config` (whole-file replace).
pub fn save_config_at(workdir: &Path, config: &SavedConfig) -> Result<(), StateError> {
    let content = envfile::render(&[
        ("API", config.api.clone()),
        ("DOMAIN", config.domain.clone()),
        ("NAMESPACE", config.namespace.clone()),
        ("PROJECT", config.project.clone()),
        ("REGISTRY", config.registry.clone()),
    ]);
    envfile::write_atomic(&config_path_at(workdir), &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(load_config_at(dir.path()).unwrap().is_none());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let config = SavedConfig {
            api: "https://api.c.example.com:6443".to_string(),
            domain: "apps.c.example.com".to_string(),
            namespace: "rfe".to_string(),
            project: "rfe-builder".to_string(),
            registry: "quay.io/acme".to_string(),
        };
        save_config_at(dir.path(), &config).unwrap();
        assert_eq!(load_config_at(dir.path()).unwrap(), Some(config));
    }

    #[test]
    fn unknown_keys_are_ignored_and_missing_keys_empty() {
        let dir = TempDir::new().unwrap();
        std::fs::write(config_path_at(dir.path()), "NAMESPACE=x\nEXTRA=1\n").unwrap();
        let loaded = load_config_at(dir.path()).unwrap().unwrap();
        assert_eq!(loaded.namespace, "x");
        assert!(loaded.domain.is_empty());
    }
}
