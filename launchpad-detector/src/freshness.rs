//! Modification-time helpers shared by the change detector, the reconciler
//! and the cache uploader. All timestamps are Unix epoch seconds.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Modification time of `path` in epoch seconds.
///
/// `Ok(None)` when the file does not exist; `Err` for any other metadata failure.
pub fn file_mtime(path: &Path) -> std::io::Result<Option<i64>> {
    match std::fs::metadata(path) {
        Ok(meta) => {
            let modified = meta.modified()?;
            let secs = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            Ok(Some(secs))
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

/// Summary of a directory tree's regular files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeScan {
    pub files: usize,
    /// Newest modification time across all files; `None` when empty.
    pub newest: Option<i64>,
    /// File holding the newest timestamp.
    pub newest_path: Option<PathBuf>,
}

impl TreeScan {
    pub fn is_empty(&self) -> bool {
        self.files == 0
    }
}

/// Walk `root` recursively. A missing root yields an empty scan.
///
/// Symlinks are not followed.
pub fn scan_tree(root: &Path) -> std::io::Result<TreeScan> {
    let mut scan = TreeScan::default();
    if !root.exists() {
        return Ok(scan);
    }
    walk(root, &mut scan)?;
    Ok(scan)
}

fn walk(dir: &Path, scan: &mut TreeScan) -> std::io::Result<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(&path, scan)?;
        } else if file_type.is_file() {
            scan.files += 1;
            if let Some(mtime) = file_mtime(&path)? {
                if scan.newest.map_or(true, |n| mtime > n) {
                    scan.newest = Some(mtime);
                    scan.newest_path = Some(path);
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{set_file_mtime, FileTime};
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(file_mtime(&dir.path().join("nope")).unwrap(), None);
    }

    #[test]
    fn scan_finds_newest_nested_file() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        let old = dir.path().join("old.json");
        let new = nested.join("new.json");
        std::fs::write(&old, "{}").unwrap();
        std::fs::write(&new, "{}").unwrap();
        set_file_mtime(&old, FileTime::from_unix_time(1_000, 0)).unwrap();
        set_file_mtime(&new, FileTime::from_unix_time(2_000, 0)).unwrap();

        let scan = scan_tree(dir.path()).unwrap();
        assert_eq!(scan.files, 2);
        assert_eq!(scan.newest, Some(2_000));
        assert_eq!(scan.newest_path.as_deref(), Some(new.as_path()));
    }

    #[test]
    fn root_that_is_not_a_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("vector_db");
        std::fs::write(&file, "not a tree").unwrap();
        assert!(scan_tree(&file).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subdirectory_is_an_error() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::write(locked.join("chunk.json"), "{}").unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();
        let readable = std::fs::read_dir(&locked).is_ok();

        let result = scan_tree(dir.path());
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

        // Privileged users read through the mode bits.
        if !readable {
            assert!(result.is_err());
        }
    }

    #[test]
    fn scan_of_missing_root_is_empty() {
        let dir = TempDir::new().unwrap();
        let scan = scan_tree(&dir.path().join("vector_db")).unwrap();
        assert!(scan.is_empty());
        assert_eq!(scan.newest, None);
    }
}
