//! Rule application.
//!
//! [`rewrite`] is the pure core: it runs rule groups over an in-memory buffer
//! and reports what matched. [`PatchEngine`] wraps it with file I/O and owns
//! the run's counters and change records.
//!
//! Failures never escape a file: a pattern that does not compile costs only
//! its own rule, and an unreadable or unwritable file costs only itself. Both
//! end up as strings in [`RunStats::errors`].

use crate::cache;
use crate::edit::{self, EditError};
use crate::rule::{Rule, RuleGroup};
use crate::safety::{RootGuard, SafetyError};
use regex::bytes::Regex;
use serde::{Serialize, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One rule that matched in one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    #[serde(rename = "rule")]
    pub rule_id: String,
    #[serde(rename = "count")]
    pub match_count: usize,
}

/// A file where at least one rule matched during one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    #[serde(rename = "file")]
    pub file_name: String,
    #[serde(rename = "path", serialize_with = "serialize_lossy")]
    pub full_path: PathBuf,
    pub changes: Vec<ChangeRecord>,
}

fn serialize_lossy<S: Serializer>(path: &Path, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&path.to_string_lossy())
}

/// Aggregate counters for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Total matches over all rules and files
    pub applied: usize,
    /// (rule, file) pairs with zero matches
    pub skipped: usize,
    /// Files whose write-back failed
    pub failed: usize,
    pub errors: Vec<String>,
}

impl RunStats {
    /// No errors recorded and no failed writes.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors.is_empty()
    }
}

/// Recoverable errors. Recorded, never propagated past a file.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("pattern {rule}: {source}")]
    Pattern {
        rule: String,
        source: regex::Error,
    },

    #[error("read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write {}: {source}", .path.display())]
    Write { path: PathBuf, source: EditError },

    #[error("write {}: {source}", .path.display())]
    Guard { path: PathBuf, source: SafetyError },
}

/// Result of running rule groups over a buffer.
#[derive(Debug)]
pub struct Rewrite {
    pub content: Vec<u8>,
    pub applied: usize,
    pub skipped: usize,
    pub changes: Vec<ChangeRecord>,
    pub errors: Vec<PatchError>,
}

/// Apply `groups` to `content` in declared order.
///
/// Each rule sees the output of the rules before it. A rule with matches
/// adds its match count to `applied` and gets a [`ChangeRecord`]; a rule
/// without matches adds one to `skipped`. Matching a statement whose value
/// is already the target still counts as applied.
pub fn rewrite(content: &[u8], groups: &[RuleGroup]) -> Rewrite {
    let mut out = Rewrite {
        content: content.to_vec(),
        applied: 0,
        skipped: 0,
        changes: Vec::new(),
        errors: Vec::new(),
    };

    for group in groups {
        for rule in group.rules() {
            let re = match cache::get_or_compile(rule.pattern()) {
                Ok(re) => re,
                Err(source) => {
                    out.errors.push(PatchError::Pattern {
                        rule: rule.id().to_string(),
                        source,
                    });
                    continue;
                }
            };

            let (replaced, count) = substitute(&re, rule, &out.content);
            if count == 0 {
                out.skipped += 1;
                continue;
            }

            out.content = replaced;
            out.applied += count;
            out.changes.push(ChangeRecord {
                rule_id: rule.id().to_string(),
                match_count: count,
            });
        }
    }

    out
}

/// Replace every accepted match of `re` in `haystack`.
///
/// A match whose preceding byte the rule rejects is dropped and the search
/// resumes one byte past its start, so a rejected candidate cannot hide a
/// later one.
fn substitute(re: &Regex, rule: &Rule, haystack: &[u8]) -> (Vec<u8>, usize) {
    let template = rule.replacement().as_bytes();
    let mut dst = Vec::with_capacity(haystack.len());
    let mut last = 0;
    let mut at = 0;
    let mut count = 0;

    while at <= haystack.len() {
        let Some(caps) = re.captures_at(haystack, at) else {
            break;
        };
        let Some(m) = caps.get(0) else {
            break;
        };

        if m.start() > 0 && rule.rejects_after(haystack[m.start() - 1]) {
            at = m.start() + 1;
            continue;
        }

        dst.extend_from_slice(&haystack[last..m.start()]);
        caps.expand(template, &mut dst);
        last = m.end();
        at = if m.is_empty() { m.end() + 1 } else { m.end() };
        count += 1;
    }

    dst.extend_from_slice(&haystack[last..]);
    (dst, count)
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// File vanished between discovery and processing
    Missing,
    ReadFailed,
    /// Nothing to write (no matches, or matches already at target values)
    Unchanged,
    Rewritten,
    /// Dry run: content would have changed
    WouldRewrite,
    WriteFailed,
}

/// Before/after content of a changed file.
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub path: PathBuf,
    pub before: String,
    pub after: String,
}

/// Applies rule groups to files and accumulates the run's results.
#[derive(Debug, Default)]
pub struct PatchEngine {
    dry_run: bool,
    capture_diffs: bool,
    guard: Option<RootGuard>,
    stats: RunStats,
    files: Vec<FileRecord>,
    diffs: Vec<FileDiff>,
}

impl PatchEngine {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Refuse writes that resolve outside the guard's root.
    pub fn with_guard(mut self, guard: RootGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn capture_diffs(mut self, enabled: bool) -> Self {
        self.capture_diffs = enabled;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn files(&self) -> &[FileRecord] {
        &self.files
    }

    pub fn diffs(&self) -> &[FileDiff] {
        &self.diffs
    }

    pub fn into_parts(self) -> (RunStats, Vec<FileRecord>, Vec<FileDiff>) {
        (self.stats, self.files, self.diffs)
    }

    /// Read `path`, apply `groups`, write the result back unless dry-run.
    pub fn apply_file(&mut self, path: &Path, groups: &[RuleGroup]) -> FileOutcome {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "file disappeared, skipping");
            return FileOutcome::Missing;
        }

        let original = match fs::read(path) {
            Ok(content) => content,
            Err(source) => {
                self.record(PatchError::Read {
                    path: path.to_path_buf(),
                    source,
                });
                return FileOutcome::ReadFailed;
            }
        };

        let Rewrite {
            content,
            applied,
            skipped,
            changes,
            errors,
        } = rewrite(&original, groups);

        self.stats.applied += applied;
        self.stats.skipped += skipped;
        for error in errors {
            self.record(error);
        }

        if !changes.is_empty() {
            tracing::debug!(
                path = %path.display(),
                rules = changes.len(),
                matches = applied,
                "rules matched"
            );
            self.files.push(FileRecord {
                file_name: path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                full_path: path.to_path_buf(),
                changes,
            });
        }

        if content == original {
            return FileOutcome::Unchanged;
        }

        if self.capture_diffs {
            self.diffs.push(FileDiff {
                path: path.to_path_buf(),
                before: String::from_utf8_lossy(&original).into_owned(),
                after: String::from_utf8_lossy(&content).into_owned(),
            });
        }

        if self.dry_run {
            return FileOutcome::WouldRewrite;
        }

        match self.write(path, &content) {
            Ok(()) => FileOutcome::Rewritten,
            Err(error) => {
                self.stats.failed += 1;
                self.record(error);
                FileOutcome::WriteFailed
            }
        }
    }

    fn write(&self, path: &Path, content: &[u8]) -> Result<(), PatchError> {
        if let Some(guard) = &self.guard {
            guard
                .validate_path(path)
                .map_err(|source| PatchError::Guard {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        edit::write_back(path, content).map_err(|source| PatchError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    fn record(&mut self, error: PatchError) {
        tracing::warn!("{error}");
        self.stats.errors.push(error.to_string());
    }
}
