//! Credential bundle model and the placeholder preservation policy.
//!
//! The bundle is built from the local `.env` file: `JIRA_URL`,
//! `JIRA_PERSONAL_TOKEN`, and for every configured model backend
//! `MAAS_<ID>_API_KEY`, `MAAS_<ID>_BASE_URL`, `MAAS_<ID>_MODEL_NAME`.
//! Field names are the env keys lowercased with `_` replaced by `-`;
//! values are base64-encoded.
//!
//! A live bundle whose token is real (non-empty, non-placeholder) is never
//! replaced unless the caller forces it.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use launchpad_core::envfile::EnvMap;
use launchpad_core::DeploymentTarget;
use launchpad_renderer::{Renderer, SecretContext, SecretEntry};

use crate::SyncError;

/// Env key of the token whose presence marks a bundle as configured.
pub const TOKEN_KEY: &str = "JIRA_PERSONAL_TOKEN";

/// Sentinel values shipped in sample files.
pub const PLACEHOLDERS: &[&str] = &[
    "your-api-key-here",
    "your-jira-token-here",
    "placeholder",
    "changeme",
    "replace-me",
];

/// `true` if `value` was never configured with a real secret.
pub fn is_placeholder(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return true;
    }
    let lower = value.to_ascii_lowercase();
    PLACEHOLDERS.contains(&lower.as_str()) || lower.starts_with("your-")
}

/// `JIRA_PERSONAL_TOKEN` → `jira-personal-token`
pub fn field_name(key: &str) -> String {
    key.to_ascii_lowercase().replace('_', "-")
}

/// `phi-4` → `MAAS_PHI_4`
pub fn model_prefix(model: &str) -> String {
    format!("MAAS_{}", model.to_ascii_uppercase().replace('-', "_"))
}

/// Every env key the bundle carries, in bundle order.
pub fn required_keys(models: &[String]) -> Vec<String> {
    let mut keys = vec!["JIRA_URL".to_string(), TOKEN_KEY.to_string()];
    for model in models {
        let prefix = model_prefix(model);
        for suffix in ["API_KEY", "BASE_URL", "MODEL_NAME"] {
            keys.push(format!("{prefix}_{suffix}"));
        }
    }
    keys
}

pub fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Decode one live bundle field.
pub fn decode(field: &str, encoded: &str) -> Result<String, SyncError> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|source| SyncError::Decode {
            field: field.to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// CredentialBundle
// ---------------------------------------------------------------------------

/// Plain-text credential bundle, ordered as [`required_keys`].
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialBundle {
    pub name: String,
    /// `(field, raw value)` pairs.
    pub fields: Vec<(String, String)>,
    /// Env keys absent from the file; written as empty values.
    pub missing: Vec<String>,
}

impl fmt::Debug for CredentialBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.fields.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("CredentialBundle")
            .field("name", &self.name)
            .field("fields", &names)
            .field("missing", &self.missing)
            .finish()
    }
}

impl CredentialBundle {
    pub fn from_env(name: &str, env: &EnvMap, models: &[String]) -> Self {
        let mut fields = Vec::new();
        let mut missing = Vec::new();
        for key in required_keys(models) {
            let value = match env.get(&key) {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!(key = %key, "credential key missing from env file; writing empty value");
                    missing.push(key.clone());
                    String::new()
                }
            };
            fields.push((field_name(&key), value));
        }
        Self {
            name: name.to_string(),
            fields,
            missing,
        }
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == field)
            .map(|(_, v)| v.as_str())
    }

    pub fn token(&self) -> Option<&str> {
        self.get(&field_name(TOKEN_KEY))
    }

    pub fn has_real_token(&self) -> bool {
        self.token().is_some_and(|t| !is_placeholder(t))
    }

    pub fn entries(&self) -> Vec<SecretEntry> {
        self.fields
            .iter()
            .map(|(field, value)| SecretEntry {
                field: field.clone(),
                encoded: encode(value),
            })
            .collect()
    }

    /// Secret manifest for `oc apply -f -`. Never written to disk.
    pub fn to_manifest(&self, renderer: &Renderer, target: &DeploymentTarget) -> Result<String, SyncError> {
        let ctx = SecretContext::new(target, &self.name, self.entries());
        Ok(renderer.render_secret(&ctx)?)
    }
}

// ---------------------------------------------------------------------------
// Preservation policy
// ---------------------------------------------------------------------------

/// What the cluster currently holds under the bundle name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveBundle {
    Absent,
    /// Present; `token` is the decoded token field, if any.
    Present { token: Option<String> },
}

impl LiveBundle {
    /// `true` if the live bundle holds a real token that must be preserved.
    pub fn holds_real_token(&self) -> bool {
        match self {
            LiveBundle::Absent => false,
            LiveBundle::Present { token } => token.as_deref().is_some_and(|t| !is_placeholder(t)),
        }
    }
}

/// Action taken for the credential bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretAction {
    Create,
    ReplacePlaceholder,
    Preserve,
    ForceReplace,
}

impl SecretAction {
    pub fn writes(&self) -> bool {
        !matches!(self, SecretAction::Preserve)
    }
}

impl fmt::Display for SecretAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretAction::Create => write!(f, "created"),
            SecretAction::ReplacePlaceholder => write!(f, "replaced placeholder values"),
            SecretAction::Preserve => write!(f, "preserved existing credentials"),
            SecretAction::ForceReplace => write!(f, "force-replaced existing credentials"),
        }
    }
}

pub fn decide_action(live: &LiveBundle, force: bool) -> SecretAction {
    match live {
        LiveBundle::Absent => SecretAction::Create,
        live if live.holds_real_token() => {
            if force {
                SecretAction::ForceReplace
            } else {
                SecretAction::Preserve
            }
        }
        LiveBundle::Present { .. } => SecretAction::ReplacePlaceholder,
    }
}
