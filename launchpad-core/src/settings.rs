//! Pipeline settings — built-in defaults optionally overridden by
//! `launchpad.yaml` in the working directory.
//!
//! Every field is optional in the YAML file; missing fields keep their
//! default. Settings are loaded once at startup and passed by reference into
//! each stage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{io_err, StateError};
use crate::types::Component;

/// File name of the optional settings file.
pub const SETTINGS_FILE: &str = "launchpad.yaml";

/// Default project name, used for image, deployment, service and route names.
pub const DEFAULT_PROJECT: &str = "rfe-builder";

/// Model backends the downstream service reads credentials for.
pub const DEFAULT_MODELS: &[&str] = &[
    "deepseek-r1-qwen-14b",
    "phi-4",
    "granite-3-3-8b-instruct",
    "llama-4-scout-17b",
    "mistral-small-24b",
];

/// Top-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Default project name when none is persisted.
    pub project: String,
    /// Build platform; cross-compilation to this platform is always forced.
    pub platform: String,
    /// Architecture-qualified tag applied next to `latest`.
    pub arch_tag: String,
    /// Local credential file.
    pub env_file: PathBuf,
    /// Directory holding the declarative resource bundle.
    pub manifest_dir: PathBuf,
    /// Name of the credential bundle (Secret) in the cluster.
    pub secret_name: String,
    /// Model identifiers whose `{api-key, base-url, model-name}` triples are synced.
    pub models: Vec<String>,
    pub frontend: ComponentSources,
    pub backend: ComponentSources,
    pub timeouts: Timeouts,
    pub cache: CacheSettings,
}

/// Files whose modification times decide whether a component's image is stale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentSources {
    pub dockerfile: PathBuf,
    /// Dependency manifest (e.g. `requirements.txt`).
    pub manifest: PathBuf,
    /// Tracked source files; missing ones are ignored.
    #[serde(default)]
    pub sources: Vec<PathBuf>,
}

/// Bounds for every blocking call that can hang.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub build_secs: u64,
    pub push_secs: u64,
    pub rollout_secs: u64,
    pub pod_ready_secs: u64,
    pub copy_secs: u64,
    pub verify_attempts: u32,
    pub verify_interval_secs: u64,
}

/// Local and remote locations of the precomputed cache artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Component whose pods host the cache.
    pub component: Component,
    pub vector_db: PathBuf,
    pub document_cache: PathBuf,
    pub documents: PathBuf,
    /// Root of the cache paths inside the running instance.
    pub remote_root: String,
    /// Freshness marker inside the vector index directory.
    pub marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        let shared = [
            "rfe_manager.py",
            "atlassian_client.py",
            "document_processor.py",
            "vector_database.py",
        ];
        let mut frontend_sources = vec![PathBuf::from("pm_chatbot_main.py")];
        frontend_sources.extend(shared.iter().map(PathBuf::from));
        let mut backend_sources = vec![PathBuf::from("api_server.py"), PathBuf::from("auth.py")];
        backend_sources.extend(shared.iter().map(PathBuf::from));

        Self {
            project: DEFAULT_PROJECT.to_string(),
            platform: "linux/amd64".to_string(),
            arch_tag: "amd64".to_string(),
            env_file: PathBuf::from(".env"),
            manifest_dir: PathBuf::from("openshift"),
            secret_name: format!("{DEFAULT_PROJECT}-secrets"),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            frontend: ComponentSources {
                dockerfile: PathBuf::from("Dockerfile.frontend"),
                manifest: PathBuf::from("requirements.txt"),
                sources: frontend_sources,
            },
            backend: ComponentSources {
                dockerfile: PathBuf::from("Dockerfile.api"),
                manifest: PathBuf::from("requirements.txt"),
                sources: backend_sources,
            },
            timeouts: Timeouts::default(),
            cache: CacheSettings::default(),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            build_secs: 1800,
            push_secs: 900,
            rollout_secs: 300,
            pod_ready_secs: 120,
            copy_secs: 600,
            verify_attempts: 30,
            verify_interval_secs: 10,
        }
    }
}

impl Timeouts {
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    pub fn push(&self) -> Duration {
        Duration::from_secs(self.push_secs)
    }

    pub fn copy(&self) -> Duration {
        Duration::from_secs(self.copy_secs)
    }

    pub fn rollout(&self) -> Duration {
        Duration::from_secs(self.rollout_secs)
    }

    pub fn pod_ready(&self) -> Duration {
        Duration::from_secs(self.pod_ready_secs)
    }

    pub fn verify_interval(&self) -> Duration {
        Duration::from_secs(self.verify_interval_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            component: Component::Backend,
            vector_db: PathBuf::from("vector_db"),
            document_cache: PathBuf::from("document_cache"),
            documents: PathBuf::from("documents"),
            remote_root: "/app".to_string(),
            marker: "metadata.json".to_string(),
        }
    }
}

impl CacheSettings {
    /// `/app/vector_db`
    pub fn remote_vector_db(&self) -> String {
        self.remote_join(&self.vector_db)
    }

    /// `/app/document_cache`
    pub fn remote_document_cache(&self) -> String {
        self.remote_join(&self.document_cache)
    }

    /// `/app/documents`
    pub fn remote_documents(&self) -> String {
        self.remote_join(&self.documents)
    }

    /// `/app/vector_db/metadata.json`
    pub fn remote_marker(&self) -> String {
        format!("{}/{}", self.remote_vector_db(), self.marker)
    }

    fn remote_join(&self, local: &Path) -> String {
        let leaf = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}/{}", self.remote_root.trim_end_matches('/'), leaf)
    }
}

impl Settings {
    /// Tracked sources for `component`.
    pub fn sources(&self, component: Component) -> &ComponentSources {
        match component {
            Component::Frontend => &self.frontend,
            Component::Backend => &self.backend,
        }
    }

    /// Load `launchpad.yaml` from `workdir`, or defaults if absent.
    pub fn load_at(workdir: &Path) -> Result<Self, StateError> {
        let path = workdir.join(SETTINGS_FILE);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(io_err(&path, err)),
        };
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents).map_err(|e| StateError::Settings { path, source: e })
    }
}
