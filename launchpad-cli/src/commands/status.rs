//! `launchpad status` — local view of what the next deploy would do.
//!
//! Reads only local state: no cluster or image tool is contacted, so the
//! next-apply preview assumes every deployment still exists.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use launchpad_core::{now_epoch, Component, DeploymentTarget};
use launchpad_detector::{freshness::scan_tree, newest_input};
use launchpad_sync::{deploy_cache, reconcile};

use super::{resolve, TargetArgs};

/// Arguments for `launchpad status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, workdir: &Path, target: &TargetArgs) -> Result<()> {
        let resolved = resolve(workdir, target)?;
        let report = build_report(workdir, &resolved)?;
        if self.json {
            return print_json(report);
        }
        print_table(report);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    Current,
    Pending,
    Never,
    Unknown,
}

#[derive(Debug, Clone)]
struct StatusRow {
    item: String,
    signal: Signal,
    detail: String,
    age: String,
    at: Option<String>,
}

#[derive(Debug, Clone)]
struct StatusReport {
    target: DeploymentTarget,
    rows: Vec<StatusRow>,
    next_apply: String,
    needs_apply: bool,
}

#[derive(Serialize)]
struct StatusReportJson {
    target: DeploymentTarget,
    next_apply: String,
    needs_apply: bool,
    items: Vec<StatusRowJson>,
}

#[derive(Serialize)]
struct StatusRowJson {
    item: String,
    status: &'static str,
    detail: String,
    age: String,
    at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "item")]
    item: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "age")]
    age: String,
}

fn build_report(workdir: &Path, resolved: &super::Resolved) -> Result<StatusReport> {
    let mut rows = Vec::new();

    let cache = deploy_cache::load_at(workdir).context("failed to read the deploy cache")?;
    rows.push(match &cache {
        Some(cache) => StatusRow {
            item: "last apply".to_string(),
            signal: Signal::Current,
            detail: format!("{} / {}", cache.namespace, cache.domain),
            age: format_age(cache.applied_at),
            at: cache.applied_at_utc().map(|t| t.to_rfc3339()),
        },
        None => StatusRow {
            item: "last apply".to_string(),
            signal: Signal::Never,
            detail: "no deploy cache".to_string(),
            age: "never".to_string(),
            at: None,
        },
    });

    for component in Component::all() {
        let sources = resolved.settings.sources(*component);
        let item = format!("{component} sources");
        rows.push(match newest_input(workdir, sources) {
            Ok(Some((path, mtime))) if mtime > 0 => StatusRow {
                item,
                signal: Signal::Current,
                detail: format!("newest: {}", path.display()),
                age: format_age(mtime),
                at: epoch_rfc3339(mtime),
            },
            Ok(_) => StatusRow {
                item,
                signal: Signal::Unknown,
                detail: "no tracked files found".to_string(),
                age: "-".to_string(),
                at: None,
            },
            Err(path) => StatusRow {
                item,
                signal: Signal::Pending,
                detail: format!("cannot inspect {}; will rebuild", path.display()),
                age: "-".to_string(),
                at: None,
            },
        });
    }

    let cache_settings = &resolved.settings.cache;
    for (label, dir) in [
        ("document cache", &cache_settings.document_cache),
        ("vector index", &cache_settings.vector_db),
    ] {
        let scan = scan_tree(&workdir.join(dir))
            .with_context(|| format!("failed to scan {}", dir.display()))?;
        rows.push(match scan.newest {
            Some(newest) => StatusRow {
                item: label.to_string(),
                signal: Signal::Current,
                detail: format!("{} file(s) in {}", scan.files, dir.display()),
                age: format_age(newest),
                at: epoch_rfc3339(newest),
            },
            None => StatusRow {
                item: label.to_string(),
                signal: Signal::Never,
                detail: format!("{} is empty", dir.display()),
                age: "-".to_string(),
                at: None,
            },
        });
    }

    let manifest_dir: PathBuf = workdir.join(&resolved.settings.manifest_dir);
    let decision = reconcile::decide(cache.as_ref(), &[], &resolved.target, &manifest_dir)
        .context("failed to evaluate the manifest bundle")?;

    Ok(StatusReport {
        target: resolved.target.clone(),
        rows,
        next_apply: decision.to_string(),
        needs_apply: decision.needs_apply(),
    })
}

fn print_json(report: StatusReport) -> Result<()> {
    let payload = StatusReportJson {
        target: report.target,
        next_apply: report.next_apply,
        needs_apply: report.needs_apply,
        items: report
            .rows
            .into_iter()
            .map(|row| StatusRowJson {
                item: row.item,
                status: signal_key(row.signal),
                detail: row.detail,
                age: row.age,
                at: row.at,
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(report: StatusReport) {
    let target = &report.target;
    println!(
        "Launchpad v{} | {} | {} | {}",
        env!("CARGO_PKG_VERSION"),
        target.namespace,
        target.domain,
        target.registry,
    );
    println!("API: {}", target.api);

    let separator = "■".repeat(67).bright_black().to_string();
    println!("{separator}");
    println!(
        "Indicators: {} CURRENT  {} PENDING  {} NEVER  {} UNKNOWN",
        signal_indicator(Signal::Current),
        signal_indicator(Signal::Pending),
        signal_indicator(Signal::Never),
        signal_indicator(Signal::Unknown),
    );
    println!("{separator}");

    let table_rows: Vec<StatusTableRow> = report
        .rows
        .into_iter()
        .map(|row| StatusTableRow {
            item: row.item,
            status: format!("{} {}", signal_indicator(row.signal), signal_label(row.signal)),
            detail: row.detail,
            age: row.age,
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{separator}");

    let marker = if report.needs_apply {
        signal_indicator(Signal::Pending)
    } else {
        signal_indicator(Signal::Current)
    };
    println!("{marker} next apply: {}", report.next_apply);
}

fn signal_key(signal: Signal) -> &'static str {
    match signal {
        Signal::Current => "current",
        Signal::Pending => "pending",
        Signal::Never => "never",
        Signal::Unknown => "unknown",
    }
}

fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::Current => "CURRENT",
        Signal::Pending => "PENDING",
        Signal::Never => "NEVER",
        Signal::Unknown => "UNKNOWN",
    }
}

fn signal_indicator(signal: Signal) -> String {
    match signal {
        Signal::Current => "■".green().bold().to_string(),
        Signal::Pending => "■".yellow().bold().to_string(),
        Signal::Never => "■".bright_black().bold().to_string(),
        Signal::Unknown => "■".magenta().bold().to_string(),
    }
}

fn epoch_rfc3339(secs: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

/// Compact age of an epoch timestamp, e.g. `42s ago`, `3h ago`.
fn format_age(epoch: i64) -> String {
    let secs = (now_epoch() - epoch).max(0);
    let span = if secs < 60 {
        format!("{secs}s")
    } else if secs < 3_600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        format!("{}h", secs / 3_600)
    } else {
        format!("{}d", secs / 86_400)
    };
    format!("{span} ago")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_age_buckets() {
        let now = now_epoch();
        assert_eq!(format_age(now + 30), "0s ago");
        assert_eq!(format_age(now - 90), "1m ago");
        assert_eq!(format_age(now - 7_200), "2h ago");
        assert_eq!(format_age(now - 3 * 86_400), "3d ago");
    }

    #[test]
    fn epoch_converts_to_rfc3339() {
        assert_eq!(
            epoch_rfc3339(1_718_006_400).as_deref(),
            Some("2024-06-10T08:00:00+00:00")
        );
    }
}
