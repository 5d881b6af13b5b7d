//! Target location and file discovery.
//!
//! Exclusion is decided per discovered path: a file is dropped when any
//! directory component between the search base and the file matches an
//! excluded name, however deep it sits. Hidden entries below the search
//! base (names starting with `.`) are never visited.

use crate::config::DiscoveryConfig;
use glob::Pattern;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("invalid file glob `{pattern}`: {source}")]
    Glob {
        pattern: String,
        source: glob::PatternError,
    },
}

/// Recursive file finder with a fixed exclusion list.
#[derive(Debug, Clone)]
pub struct FileFinder {
    excluded: Vec<String>,
}

impl FileFinder {
    pub fn new<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.excluded_dirs.iter().cloned())
    }

    /// Whether `path`, taken relative to `base`, passes through an excluded
    /// directory.
    pub fn is_excluded(&self, base: &Path, path: &Path) -> bool {
        let relative = path.strip_prefix(base).unwrap_or(path);
        let mut components = relative.components().peekable();

        while let Some(component) = components.next() {
            // Last component is the file itself.
            if components.peek().is_none() {
                break;
            }
            if let Component::Normal(name) = component {
                if self.excluded.iter().any(|ex| name == ex.as_str()) {
                    return true;
                }
            }
        }
        false
    }

    /// All regular files under `base` whose file name matches `glob`, sorted.
    ///
    /// Unreadable directory entries are logged and skipped. Hidden files and
    /// directories are not visited.
    pub fn find(&self, base: &Path, glob: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
        let pattern = Pattern::new(glob).map_err(|source| DiscoveryError::Glob {
            pattern: glob.to_string(),
            source,
        })?;

        let mut files = Vec::new();
        for entry in walk(base) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let matches = entry
                .file_name()
                .to_str()
                .is_some_and(|name| pattern.matches(name));
            if matches && !self.is_excluded(base, entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.starts_with('.'))
}

/// Walk `base`, pruning hidden entries below it. The base itself may be
/// hidden.
fn walk(base: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(base)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
}

/// Whether any file named `file_name` exists below `dir`, excluded or not.
fn contains_file(dir: &Path, file_name: &str) -> bool {
    walk(dir)
        .filter_map(Result::ok)
        .any(|e| e.file_type().is_file() && e.file_name() == file_name)
}

/// Pick the subtree of `root` that holds the capability file.
///
/// Candidates are tried in order; the first existing directory containing a
/// file named `capability_file` wins. Falls back to `root`.
pub fn locate_target<S: AsRef<str>>(
    root: &Path,
    candidates: &[S],
    capability_file: &str,
) -> PathBuf {
    for candidate in candidates {
        // Rebuilding from components drops a trailing `.`.
        let dir: PathBuf = root.join(candidate.as_ref()).components().collect();
        if dir.is_dir() && contains_file(&dir, capability_file) {
            tracing::debug!(dir = %dir.display(), "capability subtree located");
            return dir;
        }
    }

    tracing::debug!(
        root = %root.display(),
        "no candidate holds {capability_file}, using root"
    );
    root.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::fs;

    fn touch(root: &Path, rel: &str) -> PathBuf {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"int x;\n").unwrap();
        path
    }

    fn default_finder() -> FileFinder {
        FileFinder::from_config(&DiscoveryConfig::default())
    }

    #[test]
    fn test_find_matches_glob() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "src/a.c");
        let b = touch(dir.path(), "src/b.h");
        touch(dir.path(), "src/c.cpp");
        touch(dir.path(), "README.md");

        let files = default_finder().find(dir.path(), "*.[ch]").unwrap();
        assert_eq!(files, vec![a, b]);
    }

    #[test]
    fn test_find_excludes_nested_directories() {
        let dir = tempfile::tempdir().unwrap();
        let kept = touch(dir.path(), "libs/vkd3d/device.c");
        touch(dir.path(), "tests/device.c");
        touch(dir.path(), "libs/vkd3d/tests/d3d12/device.c");
        touch(dir.path(), "a/b/c/.git/device.c");
        touch(dir.path(), "include/private/device.c");

        let files = default_finder().find(dir.path(), "device.c").unwrap();
        assert_eq!(files, vec![kept]);
    }

    #[test]
    fn test_find_skips_hidden_entries() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join(".checkout");
        let kept = touch(&base, "src/a.c");
        touch(&base, ".cache/b.c");
        touch(&base, "src/.hg/store/c.h");
        touch(&base, "src/.swap.c");

        let files = default_finder().find(&base, "*.[ch]").unwrap();
        assert_eq!(files, vec![kept]);
    }

    #[test]
    fn test_locate_ignores_hidden_copy() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "libs/vkd3d/.orig/device.c");
        touch(dir.path(), "src/device.c");

        let config = DiscoveryConfig::default();
        let target = locate_target(dir.path(), &config.candidate_dirs, "device.c");
        assert_eq!(target, dir.path().join("src"));
    }

    #[test]
    fn test_exclusion_is_segment_based() {
        let finder = default_finder();
        let base = Path::new("/work");
        assert!(!finder.is_excluded(base, Path::new("/work/unittests/device.c")));
        assert!(!finder.is_excluded(base, Path::new("/work/src/include_paths.c")));
        assert!(finder.is_excluded(base, Path::new("/work/src/include/vkd3d.h")));
    }

    #[test]
    fn test_exclusion_relative_to_base() {
        // An excluded name above the search base does not count.
        let finder = default_finder();
        let base = Path::new("/home/me/tests/proton");
        assert!(!finder.is_excluded(base, Path::new("/home/me/tests/proton/src/device.c")));
    }

    #[test]
    fn test_invalid_glob() {
        let dir = tempfile::tempdir().unwrap();
        let err = default_finder().find(dir.path(), "[").unwrap_err();
        assert!(matches!(err, DiscoveryError::Glob { .. }));
    }

    #[test]
    fn test_locate_prefers_vendored_library() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "libs/vkd3d/libs/vkd3d/device.c");
        touch(dir.path(), "src/device.c");

        let config = DiscoveryConfig::default();
        let target = locate_target(dir.path(), &config.candidate_dirs, "device.c");
        assert_eq!(target, dir.path().join("libs/vkd3d"));
    }

    #[test]
    fn test_locate_skips_candidate_without_file() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "libs/vkd3d/other.c");
        touch(dir.path(), "src/deep/device.c");

        let config = DiscoveryConfig::default();
        let target = locate_target(dir.path(), &config.candidate_dirs, "device.c");
        assert_eq!(target, dir.path().join("src"));
    }

    #[test]
    fn test_locate_falls_back_to_root() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "main.c");

        let target = locate_target(dir.path(), &["libs/vkd3d", "src"], "device.c");
        assert_eq!(target, dir.path());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_excluded_dir_at_any_depth(
            prefix in proptest::collection::vec("[a-z]{1,6}", 0..4),
            suffix in proptest::collection::vec("[a-z]{1,6}", 0..4),
            excluded in proptest::sample::select(vec!["tests", "demos", "include", ".git"]),
        ) {
            let mut rel = PathBuf::new();
            for p in &prefix {
                rel.push(p);
            }
            rel.push(excluded);
            for s in &suffix {
                rel.push(s);
            }
            rel.push("device.c");

            let base = Path::new("/root-of-tree");
            prop_assert!(default_finder().is_excluded(base, &base.join(rel)));
        }
    }
}
