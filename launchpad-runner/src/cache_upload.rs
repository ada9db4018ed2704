//! Push-forward upload of the precomputed document cache and vector index.
//!
//! Upload happens only when the newest local cache file is newer than the
//! remote freshness marker. Copying a populated vector index is followed by
//! one instance restart so the service reloads it. Every failure here is
//! reported as [`UploadResult::Failed`] and never aborts a deploy.

use std::fmt;
use std::path::Path;

use launchpad_detector::freshness::{scan_tree, TreeScan};

use crate::context::DeployContext;
use crate::error::{io_err, RunnerError};
use crate::oc::{select_pod, PodInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    Skipped(String),
    Uploaded { restarted: bool },
    Failed(String),
}

impl fmt::Display for UploadResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadResult::Skipped(reason) => write!(f, "skipped: {reason}"),
            UploadResult::Uploaded { restarted: true } => write!(f, "uploaded (instance restarted)"),
            UploadResult::Uploaded { restarted: false } => write!(f, "uploaded"),
            UploadResult::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

pub async fn upload_cache_if_stale(ctx: &DeployContext) -> UploadResult {
    let result = match try_upload(ctx).await {
        Ok(result) => result,
        Err(err) => UploadResult::Failed(err.to_string()),
    };
    match &result {
        UploadResult::Failed(reason) => {
            tracing::warn!(reason = %reason, "cache upload failed; continuing without it")
        }
        other => tracing::info!("cache upload {other}"),
    }
    result
}

fn scan(dir: &Path) -> Result<TreeScan, RunnerError> {
    scan_tree(dir).map_err(|e| io_err(dir, e))
}

async fn try_upload(ctx: &DeployContext) -> Result<UploadResult, RunnerError> {
    let cache = &ctx.settings.cache;
    let timeouts = &ctx.settings.timeouts;
    let document_cache = ctx.workdir.join(&cache.document_cache);
    let vector_db = ctx.workdir.join(&cache.vector_db);
    let documents = ctx.workdir.join(&cache.documents);

    let documents_scan = scan(&document_cache)?;
    if documents_scan.is_empty() {
        return Ok(UploadResult::Skipped("no local cache".to_string()));
    }
    let sources_scan = scan(&documents)?;
    let local = [
        documents_scan.newest,
        scan(&vector_db)?.newest,
        sources_scan.newest,
    ]
    .into_iter()
    .flatten()
    .max()
    .unwrap_or(0);

    let oc = ctx.oc();
    let app = ctx.resource_name(cache.component);
    let pod = match select_pod(&oc.pods(&app).await?) {
        Some(pod) => {
            if let Some(remote) = oc.remote_mtime(&pod.name, &cache.remote_marker()).await? {
                if local <= remote {
                    tracing::debug!(local, remote, "remote cache marker is current");
                    return Ok(UploadResult::Skipped("remote up to date".to_string()));
                }
            }
            pod.name.clone()
        }
        None => {
            tracing::warn!(app = %app, "no running instance found; waiting for rollout before uploading");
            oc.rollout_status(&app, timeouts.rollout()).await?;
            match select_pod(&oc.pods(&app).await?) {
                Some(pod) => pod.name.clone(),
                None => return Ok(UploadResult::Failed(format!("no instance of {app} found"))),
            }
        }
    };

    if !oc.wait_pod_ready(&pod, timeouts.pod_ready()).await? {
        return Ok(UploadResult::Failed(format!(
            "instance {pod} not ready within {}s",
            timeouts.pod_ready_secs
        )));
    }

    tracing::info!(pod = %pod, files = documents_scan.files, "uploading document cache");
    oc.copy_to_pod(&pod, &document_cache, &cache.remote_document_cache(), timeouts.copy())
        .await?;
    if !sources_scan.is_empty() {
        oc.copy_to_pod(&pod, &documents, &cache.remote_documents(), timeouts.copy())
            .await?;
    }

    if !vector_db.join(&cache.marker).is_file() {
        return Ok(UploadResult::Uploaded { restarted: false });
    }
    tracing::info!(pod = %pod, "uploading vector index");
    oc.copy_to_pod(&pod, &vector_db, &cache.remote_vector_db(), timeouts.copy())
        .await?;

    // The service holds the index in memory; a fresh instance reloads it.
    oc.rollout_restart(&app).await?;
    if !oc.rollout_status(&app, timeouts.rollout()).await? {
        return Ok(UploadResult::Failed(format!(
            "{app} did not become ready after restart"
        )));
    }
    let fresh: Vec<PodInfo> = oc
        .pods(&app)
        .await?
        .into_iter()
        .filter(|p| p.name != pod)
        .collect();
    let Some(replacement) = select_pod(&fresh) else {
        return Ok(UploadResult::Failed(format!(
            "no replacement for instance {pod} after restart"
        )));
    };
    if !oc.wait_pod_ready(&replacement.name, timeouts.pod_ready()).await? {
        return Ok(UploadResult::Failed(format!(
            "replacement instance {} not ready within {}s",
            replacement.name, timeouts.pod_ready_secs
        )));
    }
    tracing::info!(old = %pod, new = %replacement.name, "instance restarted");
    Ok(UploadResult::Uploaded { restarted: true })
}
