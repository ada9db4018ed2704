//! Tera rendering engine — [`RouteKind`] enum and [`Renderer`].
//!
//! # Output mapping
//!
//! | Manifest        | Output path (under the manifest dir) | Host                        |
//! |-----------------|--------------------------------------|-----------------------------|
//! | Frontend route  | `route-frontend.yaml`                | `<project>.<domain>`        |
//! | Backend route   | `route-backend.yaml`                 | `<project>-api.<domain>`    |
//! | Credential bundle | never written to disk (piped to `oc apply -f -`) | n/a       |

use std::path::{Path, PathBuf};

use tera::Tera;

use launchpad_core::{Component, DeploymentTarget};

use crate::context::{RouteContext, SecretContext};
use crate::error::RenderError;

// ---------------------------------------------------------------------------
// Embedded templates, baked in with include_str!
// ---------------------------------------------------------------------------

const ROUTE_TEMPLATE: &str = "routes/route.yaml.tera";
const SECRET_TEMPLATE: &str = "secrets/secret.yaml.tera";

const TPLS: &[(&str, &str)] = &[
    ("shared/_header.tera", include_str!("templates/_partials/header.tera")),
    ("shared/_labels.tera", include_str!("templates/_partials/labels.tera")),
    (ROUTE_TEMPLATE, include_str!("templates/route.yaml.tera")),
    (SECRET_TEMPLATE, include_str!("templates/secret.yaml.tera")),
];

/// Embedded templates, each replaced by `<override_dir>/<name>` when that
/// file exists. Unknown files in the override directory are ignored.
fn build_tera(override_dir: Option<&Path>) -> Result<Tera, RenderError> {
    let mut sources = Vec::with_capacity(TPLS.len());
    for (name, embedded) in TPLS {
        let source = match override_dir.map(|dir| dir.join(name)) {
            Some(path) if path.is_file() => std::fs::read_to_string(&path)
                .map_err(|source| RenderError::Io { path, source })?,
            _ => (*embedded).to_string(),
        };
        sources.push((*name, source));
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(sources)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// RouteKind
// ---------------------------------------------------------------------------

/// The two network-exposure resources rewritten for every target domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    Frontend,
    Backend,
}

impl RouteKind {
    /// All routes in a stable order.
    pub fn all() -> &'static [RouteKind] {
        &[RouteKind::Frontend, RouteKind::Backend]
    }

    pub fn component(&self) -> Component {
        match self {
            RouteKind::Frontend => Component::Frontend,
            RouteKind::Backend => Component::Backend,
        }
    }

    /// File name inside the manifest directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            RouteKind::Frontend => "route-frontend.yaml",
            RouteKind::Backend => "route-backend.yaml",
        }
    }

    pub fn output_path(&self, manifest_dir: &Path) -> PathBuf {
        manifest_dir.join(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera-based engine with optional per-repository template overrides.
///
/// `override_dir` may contain `.tera` files (e.g. `routes/route.yaml.tera`)
/// that replace the embedded defaults.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(override_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(override_dir)?;
        Ok(TemplateEngine { tera })
    }

    pub fn render_route(&self, ctx: &RouteContext) -> Result<String, RenderError> {
        let rendered = self.tera.render(ROUTE_TEMPLATE, &ctx.to_tera_context()?)?;
        Ok(normalize(rendered))
    }

    pub fn render_secret(&self, ctx: &SecretContext) -> Result<String, RenderError> {
        let rendered = self.tera.render(SECRET_TEMPLATE, &ctx.to_tera_context()?)?;
        Ok(normalize(rendered))
    }
}

fn normalize(content: String) -> String {
    let mut out = content.replace("\r\n", "\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Convenience wrapper over [`TemplateEngine`].
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Renderer using only the embedded templates.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Self {
            engine: TemplateEngine::new(None)?,
        })
    }

    /// Renderer whose templates may be overridden from `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        Ok(Self {
            engine: TemplateEngine::new(Some(dir))?,
        })
    }

    /// Render both routes for `target`.
    ///
    /// Returns `Vec<(output_path, rendered_content)>` in [`RouteKind::all`] order.
    pub fn render_routes(
        &self,
        target: &DeploymentTarget,
        manifest_dir: &Path,
    ) -> Result<Vec<(PathBuf, String)>, RenderError> {
        RouteKind::all()
            .iter()
            .map(|kind| {
                let ctx = RouteContext::for_component(target, kind.component());
                Ok((kind.output_path(manifest_dir), self.engine.render_route(&ctx)?))
            })
            .collect()
    }

    /// Render the credential bundle manifest.
    pub fn render_secret(&self, ctx: &SecretContext) -> Result<String, RenderError> {
        self.engine.render_secret(ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
