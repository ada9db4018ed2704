//! # launchpad-renderer
//!
//! Tera-based rendering of the environment-specific manifests: the two
//! Route resources whose hostnames depend on the apps domain, and the
//! credential bundle (Secret).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use launchpad_core::DeploymentTarget;
//! use launchpad_renderer::Renderer;
//!
//! fn print_routes(target: &DeploymentTarget) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(outputs) = renderer.render_routes(target, Path::new("openshift")) {
//!             for (path, content) in outputs {
//!                 println!("{}: {} bytes", path.display(), content.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{RouteContext, SecretContext, SecretEntry};
pub use engine::{Renderer, RouteKind, TemplateEngine};
pub use error::RenderError;
