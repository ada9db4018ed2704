//! Deploy cache — the fingerprint of the last successful declarative apply.
//!
//! Persists `<workdir>/.deploy-cache` as flat `KEY=value` lines:
//!
//! ```text
//! DOMAIN=apps.cluster.example.com
//! NAMESPACE=rfe-builder
//! REGISTRY=quay.io/rfe-builder
//! APPLIED_AT=1718000000
//! ```
//!
//! Written only after an apply succeeds. Writes use the same atomic `.tmp` +
//! rename pattern as `.deploy-config`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use launchpad_core::{envfile, DeploymentTarget};

use crate::SyncError;

pub const CACHE_FILE: &str = ".deploy-cache";

/// Last-applied target fields plus the apply time (epoch seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployCache {
    pub domain: String,
    pub namespace: String,
    pub registry: String,
    pub applied_at: i64,
}

impl DeployCache {
    pub fn for_target(target: &DeploymentTarget, applied_at: i64) -> Self {
        Self {
            domain: target.domain.clone(),
            namespace: target.namespace.clone(),
            registry: target.registry.clone(),
            applied_at,
        }
    }

    pub fn applied_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.applied_at, 0)
    }
}

/// `<workdir>/.deploy-cache`
pub fn cache_path_at(workdir: &Path) -> PathBuf {
    workdir.join(CACHE_FILE)
}

/// Load the cache record.
///
/// Returns `None` if the file does not exist, or if it is incomplete or its
/// timestamp is not an epoch integer; such a record is never trusted.
pub fn load_at(workdir: &Path) -> Result<Option<DeployCache>, SyncError> {
    let path = cache_path_at(workdir);
    let Some(map) = envfile::load_optional(&path)? else {
        return Ok(None);
    };

    let field = |key: &str| map.get(key).filter(|v| !v.is_empty()).cloned();
    let (Some(domain), Some(namespace), Some(registry), Some(raw_ts)) = (
        field("DOMAIN"),
        field("NAMESPACE"),
        field("REGISTRY"),
        field("APPLIED_AT"),
    ) else {
        tracing::warn!(path = %path.display(), "deploy cache is incomplete; ignoring it");
        return Ok(None);
    };
    let Ok(applied_at) = raw_ts.trim().parse::<i64>() else {
        tracing::warn!(
            path = %path.display(),
            value = %raw_ts,
            "deploy cache timestamp is not an epoch integer; ignoring it"
        );
        return Ok(None);
    };

    Ok(Some(DeployCache {
        domain,
        namespace,
        registry,
        applied_at,
    }))
}

/// Save the cache record atomically (whole-file replace).
pub fn save_at(workdir: &Path, cache: &DeployCache) -> Result<(), SyncError> {
    let content = envfile::render(&[
        ("DOMAIN", cache.domain.clone()),
        ("NAMESPACE", cache.namespace.clone()),
        ("REGISTRY", cache.registry.clone()),
        ("APPLIED_AT", cache.applied_at.to_string()),
    ]);
    envfile::write_atomic(&cache_path_at(workdir), &content)?;
    Ok(())
}
