//! Launchpad core library — domain types, target resolution, local state, errors.
//!
//! - [`types`] — components and image references
//! - [`target`] — [`DeploymentTarget`] resolution and domain inference
//! - [`state`] — persisted `.deploy-config`
//! - [`envfile`] — flat `KEY=value` parsing and atomic writes
//! - [`settings`] — `launchpad.yaml` settings with defaults
//! - [`error`] — [`StateError`], [`ConfigError`]

pub mod envfile;
pub mod error;
pub mod settings;
pub mod state;
pub mod target;
pub mod types;

pub use error::{ConfigError, StateError};
pub use settings::{CacheSettings, ComponentSources, Settings, Timeouts};
pub use state::SavedConfig;
pub use target::{DeploymentTarget, TargetOverrides};
pub use types::{Component, ImageRef, ImageTags};

/// Current wall-clock time as Unix epoch seconds.
///
/// Every timestamp the pipeline compares (image creation, file mtimes, cache
/// records) uses this representation.
pub fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
