//! Atomic write-back of rewritten files.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditError {
    #[error("Path has no parent directory: {0}")]
    NoParent(PathBuf),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Replace the contents of `path` with `content`.
///
/// Uses tempfile + fsync + rename for crash safety, keeps the original
/// permissions and bumps the mtime so incremental builds pick the change up.
pub fn write_back(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let permissions = fs::metadata(path).ok().map(|m| m.permissions());

    atomic_write(path, content)?;

    if let Some(permissions) = permissions {
        fs::set_permissions(path, permissions)?;
    }

    let now = filetime::FileTime::now();
    filetime::set_file_mtime(path, now)?;

    Ok(())
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Same directory keeps the rename on one filesystem
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !parent.is_dir() {
        return Err(EditError::NoParent(path.to_path_buf()));
    }

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_back_replaces_content() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("device.c");
        fs::write(&file_path, b"original content").unwrap();

        write_back(&file_path, b"modified content").unwrap();

        assert_eq!(fs::read(&file_path).unwrap(), b"modified content");
    }

    #[test]
    fn test_write_back_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("device.c");
        fs::write(&file_path, b"a").unwrap();

        write_back(&file_path, b"b").unwrap();

        let entries = fs::read_dir(temp_dir.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[test]
    #[cfg(unix)]
    fn test_write_back_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("config.h");
        fs::write(&file_path, b"a").unwrap();
        fs::set_permissions(&file_path, fs::Permissions::from_mode(0o640)).unwrap();

        write_back(&file_path, b"b").unwrap();

        let mode = fs::metadata(&file_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[test]
    fn test_write_back_missing_parent() {
        let result = write_back(Path::new("/nonexistent-dir/device.c"), b"x");
        assert!(matches!(result, Err(EditError::NoParent(_))));
    }
}
