//! Whole-run orchestration.
//!
//! Order of work:
//! 1. locate the capability subtree under the root
//! 2. apply the profile groups (then identity override) to each capability file
//! 3. apply the build-flags group to every source file under the root
//!
//! Capability files are also source files, so they take part in both passes
//! and can get two [`FileRecord`]s.

use crate::catalog;
use crate::config::RunConfig;
use crate::discovery::{locate_target, DiscoveryError, FileFinder};
use crate::engine::{FileDiff, FileRecord, PatchEngine, RunStats};
use crate::profile::Profile;
use crate::rule::{ensure_unique_ids, DuplicateRuleId, RuleGroup};
use crate::safety::{RootGuard, SafetyError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Conditions that stop a run before any file is touched.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("source root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error(transparent)]
    DuplicateRuleId(#[from] DuplicateRuleId),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Safety(#[from] SafetyError),
}

/// Groups applied to capability files, in order.
pub fn capability_groups(profile: Profile, identity_override: bool) -> Vec<RuleGroup> {
    let mut groups = profile.groups();
    if identity_override {
        groups.push(catalog::identity_override());
    }
    groups
}

/// Groups applied to every source file, in order.
pub fn source_groups() -> Vec<RuleGroup> {
    vec![catalog::build_flags()]
}

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub profile: Profile,
    pub identity_override: bool,
    pub dry_run: bool,
    /// Canonical source root
    pub root: PathBuf,
    /// Subtree searched for capability files
    pub target: PathBuf,
    pub capability_files: Vec<PathBuf>,
    pub source_files: usize,
    pub stats: RunStats,
    pub files: Vec<FileRecord>,
    pub diffs: Vec<FileDiff>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.stats.is_success()
    }
}

/// Patch the tree under `root` according to `config`.
///
/// Only a missing root, a bad rule set or a bad glob are fatal. Per-file and
/// per-rule problems are collected in the summary's stats.
pub fn run(root: &Path, config: &RunConfig) -> Result<RunSummary, RunError> {
    if !root.is_dir() {
        return Err(RunError::RootNotFound(root.to_path_buf()));
    }
    let guard = RootGuard::new(root)?;
    let root = guard.root().to_path_buf();

    let cap_groups = capability_groups(config.profile, config.identity_override);
    let src_groups = source_groups();
    ensure_unique_ids(cap_groups.iter().chain(&src_groups))?;

    info!(
        root = %root.display(),
        profile = %config.profile,
        identity_override = config.identity_override,
        dry_run = config.dry_run,
        "starting run"
    );

    let discovery = &config.discovery;
    let finder = FileFinder::from_config(discovery);

    let target = locate_target(&root, &discovery.candidate_dirs, &discovery.capability_file);
    info!(target = %target.display(), "capability subtree");

    let capability_files = finder.find(&target, &glob_literal(&discovery.capability_file))?;
    info!(count = capability_files.len(), "capability files");

    let mut engine = PatchEngine::new(config.dry_run)
        .with_guard(guard)
        .capture_diffs(config.capture_diffs);

    for path in &capability_files {
        debug!(path = %path.display(), "capability pass");
        engine.apply_file(path, &cap_groups);
    }

    let source_files = finder.find(&root, &discovery.source_glob)?;
    info!(count = source_files.len(), "source files");

    for path in &source_files {
        engine.apply_file(path, &src_groups);
    }

    let (stats, files, diffs) = engine.into_parts();
    info!(
        applied = stats.applied,
        skipped = stats.skipped,
        failed = stats.failed,
        errors = stats.errors.len(),
        "run finished"
    );

    Ok(RunSummary {
        profile: config.profile,
        identity_override: config.identity_override,
        dry_run: config.dry_run,
        root,
        target,
        capability_files,
        source_files: source_files.len(),
        stats,
        files,
        diffs,
    })
}

/// Escape a file name so glob metacharacters match literally.
fn glob_literal(name: &str) -> String {
    glob::Pattern::escape(name)
}
