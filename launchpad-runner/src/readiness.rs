//! Readiness waiter.
//!
//! Every component is awaited concurrently and every wait is joined before
//! the result is reported. A deployment that does not exist is skipped.

use std::fmt;
use std::time::Duration;

use futures::future::join_all;

use launchpad_core::Component;

use crate::context::DeployContext;
use crate::error::RunnerError;
use crate::oc::Oc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    /// Deployment object absent from the cluster.
    Skipped,
    TimedOut,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Readiness::Ready => write!(f, "ready"),
            Readiness::Skipped => write!(f, "skipped (no deployment)"),
            Readiness::TimedOut => write!(f, "timed out"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadinessReport {
    pub outcomes: Vec<(String, Readiness)>,
}

impl ReadinessReport {
    pub fn timed_out(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|(_, r)| *r == Readiness::TimedOut)
            .map(|(name, _)| name.clone())
            .collect()
    }
}

pub async fn await_ready(oc: &Oc<'_>, deployment: &str, timeout: Duration) -> Result<Readiness, RunnerError> {
    if !oc.deployment_exists(deployment).await? {
        tracing::info!(deployment, "deployment not found; not waiting for it");
        return Ok(Readiness::Skipped);
    }
    let outcome = if oc.rollout_status(deployment, timeout).await? {
        Readiness::Ready
    } else {
        Readiness::TimedOut
    };
    tracing::info!(deployment, "rollout {outcome}");
    Ok(outcome)
}

/// Await every component. Fails with [`RunnerError::RolloutTimeout`] after
/// dumping diagnostics if any of them timed out.
pub async fn await_all(ctx: &DeployContext) -> Result<ReadinessReport, RunnerError> {
    let oc = ctx.oc();
    let timeout = ctx.settings.timeouts.rollout();
    let names: Vec<String> = Component::all().iter().map(|c| ctx.resource_name(*c)).collect();
    let results = join_all(names.iter().map(|name| await_ready(&oc, name, timeout))).await;

    let mut report = ReadinessReport::default();
    let mut first_err = None;
    for (name, result) in names.into_iter().zip(results) {
        match result {
            Ok(outcome) => report.outcomes.push((name, outcome)),
            Err(err) => {
                first_err.get_or_insert(err);
            }
        }
    }
    if let Some(err) = first_err {
        return Err(err);
    }

    let timed_out = report.timed_out();
    if !timed_out.is_empty() {
        oc.dump_diagnostics().await;
        return Err(RunnerError::RolloutTimeout {
            deployments: timed_out,
            namespace: ctx.target.namespace.clone(),
            after: timeout,
        });
    }
    Ok(report)
}
