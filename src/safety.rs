use std::path::{Path, PathBuf};
use thiserror::Error;

/// Refuses writes that would land outside the source root.
///
/// Discovery does not follow symlinked files, but a symlinked directory
/// component can still point elsewhere; every write target is
/// re-canonicalized right before the write.
#[derive(Debug, Clone)]
pub struct RootGuard {
    /// Canonical source root
    root: PathBuf,
}

#[derive(Error, Debug)]
pub enum SafetyError {
    #[error("Path is outside source root: {path} (root: {root})")]
    OutsideRoot { path: PathBuf, root: PathBuf },

    #[error("Failed to canonicalize path: {0}")]
    Canonicalize(#[from] std::io::Error),
}

impl RootGuard {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, SafetyError> {
        let root = root.as_ref().canonicalize()?;
        Ok(Self { root })
    }

    /// Check that `path` resolves inside the root.
    ///
    /// Returns the canonical path.
    pub fn validate_path(&self, path: impl AsRef<Path>) -> Result<PathBuf, SafetyError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };

        let canonical = absolute.canonicalize()?;
        if !canonical.starts_with(&self.root) {
            return Err(SafetyError::OutsideRoot {
                path: canonical,
                root: self.root.clone(),
            });
        }
        Ok(canonical)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
