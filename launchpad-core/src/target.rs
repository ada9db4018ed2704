//! Deployment target resolution.
//!
//! A [`DeploymentTarget`] is built once at startup from CLI overrides, the
//! persisted `.deploy-config`, and built-in defaults, then passed by reference
//! into every stage.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::state::SavedConfig;

pub const DEFAULT_API: &str = "https://api.cluster-8269x.8269x.sandbox2049.opentlc.com:6443";
pub const DEFAULT_NAMESPACE: &str = "rfe-builder";
pub const DEFAULT_REGISTRY: &str = "quay.io/rfe-builder";

const API_HOST_PREFIX: &str = "api.";
const API_PORT: &str = "6443";

/// Where and under which names the application is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentTarget {
    /// Cluster API endpoint, e.g. `https://api.cluster.example.com:6443`.
    pub api: String,
    /// Apps domain routes are exposed under.
    pub domain: String,
    pub namespace: String,
    /// Registry prefix images are pushed to, e.g. `quay.io/acme`.
    pub registry: String,
    /// Project name used for image, deployment, service and route names.
    pub project: String,
}

/// Values given on the command line. `None` means "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetOverrides {
    pub api: Option<String>,
    pub domain: Option<String>,
    pub namespace: Option<String>,
    pub registry: Option<String>,
}

impl DeploymentTarget {
    /// Resolve the target: CLI override → saved value → default.
    ///
    /// The domain is taken from `--domain`; otherwise inferred from an
    /// explicitly passed `--api`; otherwise the saved domain; otherwise
    /// inferred from the resolved API. Inference failure is fatal; there is
    /// no default domain.
    pub fn resolve(
        overrides: &TargetOverrides,
        saved: Option<&SavedConfig>,
        default_project: &str,
    ) -> Result<Self, ConfigError> {
        let pick = |cli: &Option<String>, stored: Option<&String>, default: &str| -> String {
            cli.as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| stored.filter(|v| !v.is_empty()).cloned())
                .unwrap_or_else(|| default.to_string())
        };

        let api = pick(&overrides.api, saved.map(|s| &s.api), DEFAULT_API);
        let namespace = pick(
            &overrides.namespace,
            saved.map(|s| &s.namespace),
            DEFAULT_NAMESPACE,
        );
        let registry = pick(
            &overrides.registry,
            saved.map(|s| &s.registry),
            DEFAULT_REGISTRY,
        );
        let project = pick(&None, saved.map(|s| &s.project), default_project);

        let explicit_domain = overrides
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        let domain = match (explicit_domain, overrides.api.is_some()) {
            (Some(domain), _) => domain.to_string(),
            (None, true) => infer_domain(&api)?,
            (None, false) => match saved.map(|s| s.domain.as_str()).filter(|d| !d.is_empty()) {
                Some(domain) => domain.to_string(),
                None => infer_domain(&api)?,
            },
        };

        let target = Self {
            api,
            domain,
            namespace,
            registry,
            project,
        };
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("api", &self.api),
            ("domain", &self.domain),
            ("namespace", &self.namespace),
            ("registry", &self.registry),
            ("project", &self.project),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyField { field });
            }
        }
        Ok(())
    }

    /// Host part of the registry prefix (`quay.io/acme` → `quay.io`).
    pub fn registry_host(&self) -> &str {
        self.registry.split('/').next().unwrap_or(&self.registry)
    }
}

/// Derive the apps domain from a cluster API URL.
///
/// `https://api.cluster-x.example.com:6443` → `apps.cluster-x.example.com`.
/// URLs without the `api.` host prefix and the `:6443` port are rejected.
pub fn infer_domain(api: &str) -> Result<String, ConfigError> {
    let fail = || ConfigError::DomainInference {
        api: api.to_string(),
    };

    let without_scheme = api
        .trim()
        .strip_prefix("https://")
        .or_else(|| api.trim().strip_prefix("http://"))
        .unwrap_or(api.trim());
    let authority = without_scheme.trim_end_matches('/');
    if authority.contains('/') {
        return Err(fail());
    }

    let (host, port) = authority.rsplit_once(':').ok_or_else(fail)?;
    if port != API_PORT {
        return Err(fail());
    }
    let rest = host.strip_prefix(API_HOST_PREFIX).ok_or_else(fail)?;
    if rest.is_empty() || rest.starts_with('.') || !rest.contains('.') {
        return Err(fail());
    }
    Ok(format!("apps.{rest}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> SavedConfig {
        SavedConfig {
            api: "https://api.saved.example.com:6443".to_string(),
            domain: "apps.saved.example.com".to_string(),
            namespace: "saved-ns".to_string(),
            project: "saved-project".to_string(),
            registry: "quay.io/saved".to_string(),
        }
    }

    #[test]
    fn infers_domain_from_sandbox_api() {
        let domain =
            infer_domain("https://api.cluster-8269x.8269x.sandbox2049.opentlc.com:6443").unwrap();
        assert_eq!(domain, "apps.cluster-8269x.8269x.sandbox2049.opentlc.com");
    }

    #[test]
    fn rejects_api_without_pattern() {
        for api in [
            "https://cluster.example.com:6443",
            "https://api.cluster.example.com",
            "https://api.cluster.example.com:443",
            "not a url",
            "",
        ] {
            let err = infer_domain(api).unwrap_err();
            assert!(
                err.to_string().contains("--domain"),
                "error for {api:?} must ask for --domain: {err}"
            );
        }
    }

    #[test]
    fn saved_values_used_when_no_overrides() {
        let saved = saved();
        let target =
            DeploymentTarget::resolve(&TargetOverrides::default(), Some(&saved), "unused").unwrap();
        assert_eq!(target.domain, "apps.saved.example.com");
        assert_eq!(target.namespace, "saved-ns");
        assert_eq!(target.project, "saved-project");
    }

    #[test]
    fn explicit_api_reinfers_domain_over_saved_domain() {
        let saved = saved();
        let overrides = TargetOverrides {
            api: Some("https://api.other.example.com:6443".to_string()),
            ..Default::default()
        };
        let target = DeploymentTarget::resolve(&overrides, Some(&saved), "unused").unwrap();
        assert_eq!(target.domain, "apps.other.example.com");
    }

    #[test]
    fn explicit_domain_wins_even_with_bad_api() {
        let overrides = TargetOverrides {
            api: Some("https://kube.internal".to_string()),
            domain: Some("apps.internal".to_string()),
            ..Default::default()
        };
        let target = DeploymentTarget::resolve(&overrides, None, "rfe-builder").unwrap();
        assert_eq!(target.domain, "apps.internal");
        assert_eq!(target.registry, DEFAULT_REGISTRY);
    }

    #[test]
    fn malformed_explicit_api_is_fatal() {
        let overrides = TargetOverrides {
            api: Some("https://kube.internal".to_string()),
            ..Default::default()
        };
        let err = DeploymentTarget::resolve(&overrides, Some(&saved()), "x").unwrap_err();
        assert!(matches!(err, ConfigError::DomainInference { .. }));
    }

    #[test]
    fn defaults_without_saved_state() {
        let target =
            DeploymentTarget::resolve(&TargetOverrides::default(), None, "rfe-builder").unwrap();
        assert_eq!(target.api, DEFAULT_API);
        assert_eq!(target.domain, "apps.cluster-8269x.8269x.sandbox2049.opentlc.com");
        assert_eq!(target.registry_host(), "quay.io");
    }
}
