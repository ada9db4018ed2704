//! # launchpad-sync
//!
//! Local half of reconciliation: the deploy cache, the apply decision, the
//! content-gated route writer, bundle selection and the credential bundle.
//!
//! Call [`prepare_apply`] to decide and stage an apply, then [`record_apply`]
//! once the cluster accepted it.

pub mod bundle;
pub mod deploy_cache;
pub mod diff;
pub mod error;
pub mod pipeline;
pub mod reconcile;
pub mod secrets;
pub mod writer;

pub use bundle::ApplyPlan;
pub use deploy_cache::DeployCache;
pub use diff::{diff_routes, FileDiff};
pub use error::SyncError;
pub use pipeline::{prepare_apply, record_apply, PreparedApply};
pub use reconcile::ReconcileDecision;
pub use secrets::{CredentialBundle, LiveBundle, SecretAction};
pub use writer::WriteResult;
