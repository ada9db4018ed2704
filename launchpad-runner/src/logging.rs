//! Tracing setup and size-based rotation of the per-run deploy log.
//!
//! Console output goes to stderr (plain or JSON). A deploy run additionally
//! appends JSON lines to `.launchpad/logs/deploy.log`, which is rotated when
//! it exceeds 10 MiB, keeping 5 copies:
//!   deploy.log → deploy.log.1 → deploy.log.2 → … → deploy.log.5

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::error::{io_err, RunnerError};

/// Maximum log file size before rotation (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated backup files to keep.
pub const MAX_ROTATED_FILES: usize = 5;

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    /// Raise the default filter from `info` to `debug`.
    pub verbose: bool,
    /// JSON console output.
    pub json: bool,
    /// Also append JSON lines to this file (rotated first).
    pub file: Option<PathBuf>,
}

type Filtered = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Filtered> + Send + Sync>;

/// Install the global subscriber. `RUST_LOG` overrides the default filter.
///
/// Calling this twice is harmless; the second call leaves the first
/// subscriber in place.
pub fn init_tracing(options: &LogOptions) -> Result<(), RunnerError> {
    let default = if options.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let mut layers: Vec<BoxedLayer> = Vec::new();
    if options.json {
        layers.push(
            fmt::layer()
                .json()
                .with_target(false)
                .with_writer(io::stderr)
                .boxed(),
        );
    } else {
        layers.push(fmt::layer().with_target(false).with_writer(io::stderr).boxed());
    }

    if let Some(path) = &options.file {
        let file = open_log_file(path)?;
        layers.push(
            fmt::layer()
                .json()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .boxed(),
        );
    }

    let _ = tracing_subscriber::registry().with(filter).with(layers).try_init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<fs::File, RunnerError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    }
    // Rotation problems must not block a deploy.
    if let Err(err) = rotate_if_needed(path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        eprintln!("warning: log rotation failed for {}: {err}", path.display());
    }
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| io_err(path, e))
}

/// Rotate `log_path` if its size reaches `max_bytes`.
///
/// Returns `true` if rotation occurred, `false` if the file was under the
/// threshold or did not exist yet.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes {
        return Ok(false);
    }

    let oldest = numbered_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }
    for n in (1..max_files).rev() {
        let src = numbered_path(log_path, n);
        if src.exists() {
            fs::rename(&src, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    Ok(true)
}

/// `deploy.log` → `deploy.log.<n>`
fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let name = base
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or(crate::paths::DEPLOY_LOG);
    base.with_file_name(format!("{name}.{n}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn oversized(path: &Path, fill: u8) {
        fs::write(path, vec![fill; MAX_LOG_BYTES as usize]).unwrap();
    }

    #[test]
    fn small_file_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("deploy.log");
        fs::write(&log, "line\n").unwrap();
        assert!(!rotate_if_needed(&log, MAX_LOG_BYTES, MAX_ROTATED_FILES).unwrap());
        assert!(!numbered_path(&log, 1).exists());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("deploy.log");
        assert!(!rotate_if_needed(&log, MAX_LOG_BYTES, MAX_ROTATED_FILES).unwrap());
    }

    #[test]
    fn generations_shift_and_are_capped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("deploy.log");
        for n in 1..=MAX_ROTATED_FILES {
            fs::write(numbered_path(&log, n), format!("gen-{n}")).unwrap();
        }
        oversized(&log, b'x');

        assert!(rotate_if_needed(&log, MAX_LOG_BYTES, MAX_ROTATED_FILES).unwrap());
        assert!(!log.exists());
        assert_eq!(fs::metadata(numbered_path(&log, 1)).unwrap().len(), MAX_LOG_BYTES);
        assert_eq!(fs::read_to_string(numbered_path(&log, 2)).unwrap(), "gen-1");
        assert_eq!(fs::read_to_string(numbered_path(&log, 5)).unwrap(), "gen-4");
        assert!(!numbered_path(&log, MAX_ROTATED_FILES + 1).exists());
    }

    #[test]
    fn open_log_file_creates_directories() {
        let dir = TempDir::new().unwrap();
        let log = crate::paths::deploy_log_path(dir.path());
        open_log_file(&log).unwrap();
        assert!(log.exists());
    }
}
