//! Cluster CLI wrapper (`oc`), scoped to one namespace.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::DateTime;
use serde::Deserialize;

use crate::error::RunnerError;
use crate::exec::{failure, run_checked, CommandRunner, CommandSpec};

const OC: &str = "oc";

/// Extra time granted to a command whose own `--timeout` flag bounds it.
const GRACE: Duration = Duration::from_secs(30);
const QUERY_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Pods
// ---------------------------------------------------------------------------

/// The subset of a pod the pipeline looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodInfo {
    pub name: String,
    pub ready: bool,
    /// `creationTimestamp` in epoch seconds; 0 if absent or unparsable.
    pub created: i64,
    pub terminating: bool,
}

#[derive(Deserialize)]
struct PodList {
    #[serde(default)]
    items: Vec<PodItem>,
}

#[derive(Deserialize)]
struct PodItem {
    metadata: PodMeta,
    #[serde(default)]
    status: PodStatus,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodMeta {
    name: String,
    #[serde(default)]
    creation_timestamp: Option<String>,
    #[serde(default)]
    deletion_timestamp: Option<String>,
}

#[derive(Deserialize, Default)]
struct PodStatus {
    #[serde(default)]
    conditions: Vec<PodCondition>,
}

#[derive(Deserialize)]
struct PodCondition {
    #[serde(rename = "type")]
    kind: String,
    status: String,
}

/// Parse `oc get pods -o json` output.
pub fn parse_pods(json: &str) -> Result<Vec<PodInfo>, serde_json::Error> {
    let list: PodList = serde_json::from_str(json)?;
    Ok(list
        .items
        .into_iter()
        .map(|item| PodInfo {
            ready: item
                .status
                .conditions
                .iter()
                .any(|c| c.kind == "Ready" && c.status == "True"),
            created: item
                .metadata
                .creation_timestamp
                .as_deref()
                .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                .map(|ts| ts.timestamp())
                .unwrap_or(0),
            terminating: item.metadata.deletion_timestamp.is_some(),
            name: item.metadata.name,
        })
        .collect())
}

/// Instance selection policy: ignore terminating pods, prefer Ready ones,
/// then the most recently created. Ties break on name for determinism.
pub fn select_pod(pods: &[PodInfo]) -> Option<&PodInfo> {
    pods.iter()
        .filter(|p| !p.terminating)
        .max_by(|a, b| {
            (a.ready, a.created)
                .cmp(&(b.ready, b.created))
                .then_with(|| b.name.cmp(&a.name))
        })
}

// ---------------------------------------------------------------------------
// Oc
// ---------------------------------------------------------------------------

pub struct Oc<'a> {
    runner: &'a dyn CommandRunner,
    namespace: &'a str,
}

impl<'a> Oc<'a> {
    pub fn new(runner: &'a dyn CommandRunner, namespace: &'a str) -> Self {
        Self { runner, namespace }
    }

    fn cmd(&self) -> CommandSpec {
        CommandSpec::new(OC)
    }

    fn scoped(&self) -> CommandSpec {
        CommandSpec::new(OC).args(["-n", self.namespace])
    }

    fn pods_hint(&self) -> String {
        format!("oc get pods -n {}", self.namespace)
    }

    // ----- session ---------------------------------------------------------

    /// Current user, or `None` when not logged in.
    pub async fn whoami(&self) -> Result<Option<String>, RunnerError> {
        let output = self
            .runner
            .run(&self.cmd().arg("whoami").timeout(QUERY_TIMEOUT))
            .await?;
        if !output.success() {
            return Ok(None);
        }
        let user = output.stdout.trim();
        Ok((!user.is_empty()).then(|| user.to_string()))
    }

    /// Create the namespace unless it already exists. Returns `true` if created.
    pub async fn ensure_project(&self) -> Result<bool, RunnerError> {
        let exists = self
            .runner
            .run(&self.cmd().args(["get", "project", self.namespace]).timeout(QUERY_TIMEOUT))
            .await?
            .success();
        if exists {
            return Ok(false);
        }
        let spec = self
            .cmd()
            .args(["new-project", self.namespace])
            .timeout(QUERY_TIMEOUT);
        run_checked(self.runner, &spec, "oc projects").await?;
        Ok(true)
    }

    // ----- resources -------------------------------------------------------

    pub async fn deployment_exists(&self, name: &str) -> Result<bool, RunnerError> {
        let spec = self
            .scoped()
            .args(["get", "deployment", name, "-o", "name"])
            .timeout(QUERY_TIMEOUT);
        Ok(self.runner.run(&spec).await?.success())
    }

    /// `oc apply` every file in one invocation.
    pub async fn apply_files(&self, files: &[PathBuf]) -> Result<(), RunnerError> {
        if files.is_empty() {
            return Ok(());
        }
        let mut spec = self.scoped().arg("apply");
        for file in files {
            spec = spec.arg("-f").arg(file.to_string_lossy());
        }
        let spec = spec.timeout(Duration::from_secs(300));
        run_checked(self.runner, &spec, &format!("oc get events -n {}", self.namespace)).await?;
        Ok(())
    }

    /// Apply the credential bundle manifest through stdin.
    pub async fn apply_stdin(&self, manifest: String) -> Result<(), RunnerError> {
        let hint = format!("oc get secrets -n {}", self.namespace);
        self.apply_from_stdin(manifest, QUERY_TIMEOUT, &hint).await
    }

    /// Apply a YAML stream of bundle resources through stdin.
    pub async fn apply_documents(&self, stream: String) -> Result<(), RunnerError> {
        let hint = format!("oc get events -n {}", self.namespace);
        self.apply_from_stdin(stream, Duration::from_secs(300), &hint).await
    }

    async fn apply_from_stdin(
        &self,
        input: String,
        timeout: Duration,
        hint: &str,
    ) -> Result<(), RunnerError> {
        let spec = self
            .scoped()
            .args(["apply", "-f", "-"])
            .stdin(input)
            .timeout(timeout);
        run_checked(self.runner, &spec, hint).await?;
        Ok(())
    }

    /// Raw (still base64) value of one secret field.
    ///
    /// `Ok(None)` if the secret does not exist; `Ok(Some(""))` if it exists
    /// without that field.
    pub async fn secret_field(&self, secret: &str, field: &str) -> Result<Option<String>, RunnerError> {
        let spec = self
            .scoped()
            .args(["get", "secret", secret, "-o"])
            .arg(format!("jsonpath={{.data['{field}']}}"))
            .timeout(QUERY_TIMEOUT);
        let output = self.runner.run(&spec).await?;
        if output.success() {
            return Ok(Some(output.stdout.trim().to_string()));
        }
        let stderr = output.stderr.to_ascii_lowercase();
        if stderr.contains("notfound") || stderr.contains("not found") {
            return Ok(None);
        }
        Err(failure(
            &spec,
            &output,
            &format!("oc get secret {secret} -n {}", self.namespace),
        ))
    }

    // ----- readiness -------------------------------------------------------

    /// `oc rollout status`; `false` when it does not complete within `timeout`.
    pub async fn rollout_status(&self, deployment: &str, timeout: Duration) -> Result<bool, RunnerError> {
        let spec = self
            .scoped()
            .args(["rollout", "status"])
            .arg(format!("deployment/{deployment}"))
            .arg(format!("--timeout={}s", timeout.as_secs()))
            .timeout(timeout + GRACE);
        match self.runner.run(&spec).await {
            Ok(output) => Ok(output.success()),
            Err(RunnerError::CommandTimeout { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    pub async fn pods(&self, app: &str) -> Result<Vec<PodInfo>, RunnerError> {
        let spec = self
            .scoped()
            .args(["get", "pods", "-l"])
            .arg(format!("app={app}"))
            .args(["-o", "json"])
            .timeout(QUERY_TIMEOUT);
        let output = run_checked(self.runner, &spec, &self.pods_hint()).await?;
        parse_pods(&output.stdout).map_err(|e| RunnerError::Parse {
            command: spec.display(),
            detail: e.to_string(),
        })
    }

    pub async fn wait_pod_ready(&self, pod: &str, timeout: Duration) -> Result<bool, RunnerError> {
        let spec = self
            .scoped()
            .args(["wait", "--for=condition=Ready"])
            .arg(format!("pod/{pod}"))
            .arg(format!("--timeout={}s", timeout.as_secs()))
            .timeout(timeout + GRACE);
        match self.runner.run(&spec).await {
            Ok(output) => Ok(output.success()),
            Err(RunnerError::CommandTimeout { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    // ----- pod filesystem --------------------------------------------------

    /// Modification time of `path` inside `pod`; `None` if it does not exist.
    pub async fn remote_mtime(&self, pod: &str, path: &str) -> Result<Option<i64>, RunnerError> {
        let spec = self
            .scoped()
            .args(["exec", pod, "--", "stat", "-c", "%Y", path])
            .timeout(QUERY_TIMEOUT);
        let output = self.runner.run(&spec).await?;
        if !output.success() {
            return Ok(None);
        }
        Ok(output.stdout.trim().parse::<i64>().ok())
    }

    /// Copy the contents of `local` into `remote` inside `pod`.
    pub async fn copy_to_pod(
        &self,
        pod: &str,
        local: &Path,
        remote: &str,
        timeout: Duration,
    ) -> Result<(), RunnerError> {
        let spec = self
            .scoped()
            .arg("cp")
            .arg(local.to_string_lossy())
            .arg(format!("{pod}:{remote}"))
            .timeout(timeout);
        run_checked(self.runner, &spec, &self.pods_hint()).await?;
        Ok(())
    }

    /// `oc rollout restart`; replaces every pod through a new rollout.
    pub async fn rollout_restart(&self, deployment: &str) -> Result<(), RunnerError> {
        let spec = self
            .scoped()
            .args(["rollout", "restart"])
            .arg(format!("deployment/{deployment}"))
            .timeout(QUERY_TIMEOUT);
        run_checked(self.runner, &spec, &self.pods_hint()).await?;
        Ok(())
    }

    // ----- services --------------------------------------------------------

    /// `true` if `service` has at least one ready endpoint address.
    pub async fn has_endpoints(&self, service: &str) -> Result<bool, RunnerError> {
        let spec = self
            .scoped()
            .args(["get", "endpoints", service, "-o"])
            .arg("jsonpath={.subsets[*].addresses[*].ip}")
            .timeout(QUERY_TIMEOUT);
        let output = self.runner.run(&spec).await?;
        Ok(output.success() && !output.stdout.trim().is_empty())
    }

    // ----- diagnostics -----------------------------------------------------

    /// Log pod state and recent events. Failures here are only logged.
    pub async fn dump_diagnostics(&self) {
        let snapshots = [
            self.scoped().args(["get", "pods", "-o", "wide"]),
            self.scoped()
                .args(["get", "events", "--sort-by=.lastTimestamp"]),
        ];
        for spec in snapshots {
            let spec = spec.timeout(QUERY_TIMEOUT);
            match self.runner.run(&spec).await {
                Ok(output) => {
                    let text = if output.success() {
                        output.stdout
                    } else {
                        output.stderr
                    };
                    let recent: Vec<&str> = text.lines().rev().take(25).collect();
                    let recent: Vec<&str> = recent.into_iter().rev().collect();
                    tracing::warn!(command = %spec.display(), "diagnostics:\n{}", recent.join("\n"));
                }
                Err(err) => {
                    tracing::warn!(command = %spec.display(), error = %err, "diagnostics unavailable")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::CommandOutput;
    use crate::fake::ScriptedRunner;

    const PODS: &str = r#"{
      "items": [
        {"metadata": {"name": "api-old", "creationTimestamp": "2024-06-10T08:00:00Z"},
         "status": {"conditions": [{"type": "Ready", "status": "True"}]}},
        {"metadata": {"name": "api-new", "creationTimestamp": "2024-06-10T09:00:00Z"},
         "status": {"conditions": [{"type": "Ready", "status": "False"}]}},
        {"metadata": {"name": "api-newest-ready", "creationTimestamp": "2024-06-10T08:30:00Z"},
         "status": {"conditions": [{"type": "Ready", "status": "True"}]}},
        {"metadata": {"name": "api-dying", "creationTimestamp": "2024-06-10T10:00:00Z",
                      "deletionTimestamp": "2024-06-10T10:05:00Z"},
         "status": {"conditions": [{"type": "Ready", "status": "True"}]}}
      ]
    }"#;

    #[test]
    fn parse_and_select_prefers_newest_ready() {
        let pods = parse_pods(PODS).unwrap();
        assert_eq!(pods.len(), 4);
        assert_eq!(select_pod(&pods).unwrap().name, "api-newest-ready");
    }

    #[test]
    fn select_falls_back_to_newest_unready() {
        let pods = vec![
            PodInfo { name: "a".into(), ready: false, created: 10, terminating: false },
            PodInfo { name: "b".into(), ready: false, created: 20, terminating: false },
        ];
        assert_eq!(select_pod(&pods).unwrap().name, "b");
        assert!(select_pod(&[]).is_none());
    }

    #[test]
    fn pods_without_status_parse() {
        let pods = parse_pods(r#"{"items":[{"metadata":{"name":"p"}}]}"#).unwrap();
        assert_eq!(
            pods,
            vec![PodInfo { name: "p".into(), ready: false, created: 0, terminating: false }]
        );
    }

    #[tokio::test]
    async fn missing_secret_is_none() {
        let runner = ScriptedRunner::new();
        runner.on(
            "get secret",
            CommandOutput::failed(1, "Error from server (NotFound): secrets \"s\" not found"),
        );
        let oc = Oc::new(&runner, "rfe");
        assert_eq!(oc.secret_field("s", "jira-personal-token").await.unwrap(), None);
    }

    #[tokio::test]
    async fn secret_query_error_is_surfaced() {
        let runner = ScriptedRunner::new();
        runner.on("get secret", CommandOutput::failed(1, "Unauthorized"));
        let err = Oc::new(&runner, "rfe")
            .secret_field("s", "jira-personal-token")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("oc get secret s -n rfe"));
    }

    #[tokio::test]
    async fn remote_mtime_parses_stat_output() {
        let runner = ScriptedRunner::new();
        runner.on("stat -c %Y", CommandOutput::ok("1718000000\n"));
        let oc = Oc::new(&runner, "rfe");
        assert_eq!(
            oc.remote_mtime("pod", "/app/vector_db/metadata.json").await.unwrap(),
            Some(1_718_000_000)
        );
        assert_eq!(
            runner.calls()[0],
            "oc -n rfe exec pod -- stat -c %Y /app/vector_db/metadata.json"
        );
    }

    #[tokio::test]
    async fn apply_files_uses_single_invocation() {
        let runner = ScriptedRunner::new();
        Oc::new(&runner, "rfe")
            .apply_files(&[PathBuf::from("a.yaml"), PathBuf::from("b.yaml")])
            .await
            .unwrap();
        assert_eq!(runner.calls(), vec!["oc -n rfe apply -f a.yaml -f b.yaml"]);
    }
}
