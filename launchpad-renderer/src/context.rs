//! Template contexts — serializable rendering payloads built from a
//! [`DeploymentTarget`].

use serde::{Deserialize, Serialize};

use launchpad_core::{Component, DeploymentTarget};

use crate::error::RenderError;

/// Port the frontend container listens on.
pub const FRONTEND_PORT: u16 = 8501;
/// Port the backend API container listens on.
pub const BACKEND_PORT: u16 = 8000;

/// Payload for a single network-exposure (Route) resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteContext {
    pub name: String,
    pub namespace: String,
    pub project: String,
    pub component: Option<String>,
    /// Public hostname substituted from the apps domain.
    pub host: String,
    pub service: String,
    pub target_port: u16,
}

/// One encoded field of the credential bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretEntry {
    /// Lowercase-hyphenated field name, e.g. `jira-personal-token`.
    pub field: String,
    /// Base64 of the raw value.
    pub encoded: String,
}

/// Payload for the credential bundle (Secret) manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretContext {
    pub name: String,
    pub namespace: String,
    pub project: String,
    pub component: Option<String>,
    pub entries: Vec<SecretEntry>,
}

impl RouteContext {
    /// Build the route payload for `component` under `target`.
    pub fn for_component(target: &DeploymentTarget, component: Component) -> Self {
        let name = component.resource_name(&target.project);
        let target_port = match component {
            Component::Frontend => FRONTEND_PORT,
            Component::Backend => BACKEND_PORT,
        };
        Self {
            service: name.clone(),
            name,
            namespace: target.namespace.clone(),
            project: target.project.clone(),
            component: Some(component.to_string()),
            host: component.route_host(&target.project, &target.domain),
            target_port,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

impl SecretContext {
    pub fn new(target: &DeploymentTarget, name: &str, entries: Vec<SecretEntry>) -> Self {
        Self {
            name: name.to_string(),
            namespace: target.namespace.clone(),
            project: target.project.clone(),
            component: None,
            entries,
        }
    }

    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> DeploymentTarget {
        DeploymentTarget {
            api: "https://api.c.example.com:6443".to_string(),
            domain: "apps.c.example.com".to_string(),
            namespace: "rfe".to_string(),
            registry: "quay.io/acme".to_string(),
            project: "rfe-builder".to_string(),
        }
    }

    #[test]
    fn route_context_fields_populated() {
        let ctx = RouteContext::for_component(&target(), Component::Backend);
        assert_eq!(ctx.name, "rfe-builder-backend");
        assert_eq!(ctx.service, "rfe-builder-backend");
        assert_eq!(ctx.host, "rfe-builder-api.apps.c.example.com");
        assert_eq!(ctx.target_port, BACKEND_PORT);
        assert_eq!(ctx.component.as_deref(), Some("backend"));
    }

    #[test]
    fn to_tera_context_succeeds() {
        let ctx = SecretContext::new(&target(), "rfe-builder-secrets", vec![]);
        let _ = ctx.to_tera_context().expect("context conversion");
    }
}
