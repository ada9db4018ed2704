//! Flat `KEY=value` file parsing and atomic writing.
//!
//! Used for the credential file (`.env`) and for the persisted state files
//! (`.deploy-config`, `.deploy-cache`). Accepted syntax:
//!
//! ```text
//! # comment
//! KEY=value
//! export KEY="quoted value"
//! KEY='single quoted'
//! ```
//!
//! Later assignments win over earlier ones.

use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{io_err, StateError};

/// Parsed key/value pairs, sorted by key.
pub type EnvMap = BTreeMap<String, String>;

/// Parse `KEY=value` content. `origin` is only used for error messages.
pub fn parse(content: &str, origin: &Path) -> Result<EnvMap, StateError> {
    let mut map = EnvMap::new();
    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
        let Some((key, value)) = line.split_once('=') else {
            return Err(StateError::Malformed {
                path: origin.to_path_buf(),
                line: idx + 1,
                content: raw.to_string(),
            });
        };
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(StateError::Malformed {
                path: origin.to_path_buf(),
                line: idx + 1,
                content: raw.to_string(),
            });
        }
        map.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    Ok(map)
}

/// Read and parse the file at `path`.
pub fn load(path: &Path) -> Result<EnvMap, StateError> {
    let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse(&content, path)
}

/// Read and parse the file at `path`, returning `None` if it does not exist.
pub fn load_optional(path: &Path) -> Result<Option<EnvMap>, StateError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse(&content, path).map(Some),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(io_err(path, err)),
    }
}

/// Serialize `entries` in the given order, one `KEY=value` per line.
pub fn render(entries: &[(&str, String)]) -> String {
    let mut out = String::new();
    for (key, value) in entries {
        out.push_str(key);
        out.push('=');
        if value.contains(char::is_whitespace) || value.contains('#') {
            out.push('"');
            out.push_str(value);
            out.push('"');
        } else {
            out.push_str(value);
        }
        out.push('\n');
    }
    out
}

/// Atomically write `content` to `path`.
///
/// Write flow: `.tmp` sibling → `chmod 0600` → `rename`. The whole file is
/// replaced; there is no locking, so concurrent writers must be serialized by
/// the caller.
pub fn write_atomic(path: &Path, content: &str) -> Result<(), StateError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    set_file_permissions(&tmp)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), StateError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
        .map_err(|e| io_err(path, e))
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), StateError> {
    Ok(())
}
