//! Credential bundle stage: `.env` → Secret, applied over stdin.

use launchpad_core::envfile;
use launchpad_sync::secrets::{decide_action, decode, field_name, TOKEN_KEY};
use launchpad_sync::{CredentialBundle, LiveBundle, SecretAction};

use crate::context::DeployContext;
use crate::error::RunnerError;
use crate::oc::Oc;
use crate::preflight;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretReport {
    pub action: SecretAction,
    /// Env keys that were absent and written as empty values.
    pub missing_keys: Vec<String>,
}

/// Read the live bundle's token field.
pub async fn live_bundle(oc: &Oc<'_>, secret: &str) -> Result<LiveBundle, RunnerError> {
    let field = field_name(TOKEN_KEY);
    let live = match oc.secret_field(secret, &field).await? {
        None => LiveBundle::Absent,
        Some(raw) if raw.is_empty() => LiveBundle::Present { token: None },
        Some(raw) => LiveBundle::Present {
            token: Some(decode(&field, &raw)?),
        },
    };
    Ok(live)
}

/// Build the bundle from the local env file and apply it unless the live
/// bundle holds a real token and `force` is not set.
pub async fn sync_secrets(ctx: &DeployContext, force: bool) -> Result<SecretReport, RunnerError> {
    preflight::check_env_file(ctx)?;
    let env = envfile::load(&ctx.env_file())?;
    let bundle = CredentialBundle::from_env(&ctx.settings.secret_name, &env, &ctx.settings.models);
    if !bundle.has_real_token() {
        tracing::warn!(key = TOKEN_KEY, "local token is empty or a placeholder");
    }

    let oc = ctx.oc();
    let live = live_bundle(&oc, &bundle.name).await?;
    let action = decide_action(&live, force);
    if action.writes() {
        let manifest = bundle.to_manifest(&ctx.renderer, &ctx.target)?;
        oc.apply_stdin(manifest).await?;
    }
    tracing::info!(
        secret = %bundle.name,
        fields = bundle.fields.len(),
        missing = bundle.missing.len(),
        "credential bundle {action}"
    );

    Ok(SecretReport {
        action,
        missing_keys: bundle.missing,
    })
}
