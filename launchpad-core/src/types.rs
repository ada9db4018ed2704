//! Domain types shared by every pipeline stage.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A fully qualified image reference, e.g. `quay.io/acme/rfe-builder-frontend:amd64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageRef(pub String);

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ImageRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ImageRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// One independently built and deployed part of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Frontend,
    Backend,
}

impl Component {
    /// All components in a stable order.
    pub fn all() -> &'static [Component] {
        &[Component::Frontend, Component::Backend]
    }

    /// Name shared by the image, deployment and service: `<project>-<component>`.
    pub fn resource_name(&self, project: &str) -> String {
        format!("{project}-{self}")
    }

    /// Public route host for this component.
    ///
    /// The frontend is served at `<project>.<domain>`, the backend API at
    /// `<project>-api.<domain>`.
    pub fn route_host(&self, project: &str, domain: &str) -> String {
        match self {
            Component::Frontend => format!("{project}.{domain}"),
            Component::Backend => format!("{project}-api.{domain}"),
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Frontend => write!(f, "frontend"),
            Component::Backend => write!(f, "backend"),
        }
    }
}

impl FromStr for Component {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "frontend" => Ok(Component::Frontend),
            "backend" => Ok(Component::Backend),
            other => Err(format!(
                "unknown component '{other}'; expected: frontend, backend"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Image tags
// ---------------------------------------------------------------------------

/// The pair of tags every build produces: an architecture-qualified tag and
/// the floating `latest` alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTags {
    pub arch: ImageRef,
    pub latest: ImageRef,
}

impl ImageTags {
    pub fn new(registry: &str, project: &str, component: Component, arch_tag: &str) -> Self {
        let repo = format!(
            "{}/{}",
            registry.trim_end_matches('/'),
            component.resource_name(project)
        );
        Self {
            arch: ImageRef(format!("{repo}:{arch_tag}")),
            latest: ImageRef(format!("{repo}:latest")),
        }
    }

    /// Both tags, arch-qualified first.
    pub fn both(&self) -> [&ImageRef; 2] {
        [&self.arch, &self.latest]
    }
}
