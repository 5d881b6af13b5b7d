//! Cap Patcher: profile-driven overrides of hard-coded capability values
//!
//! Rewrites capability-reporting statements in a native source tree (for
//! example the feature queries in vkd3d's `device.c`) using ordered groups of
//! named regex substitutions.
//!
//! # Architecture
//!
//! A [`Profile`] resolves to an ordered list of [`RuleGroup`]s. The
//! [`run`](run::run) driver locates the capability subtree, applies the
//! profile's groups (plus the identity override) to capability files, then
//! applies the build-flags group to every source file. [`PatchEngine`] does
//! the per-file work and owns the run's [`RunStats`].
//!
//! # Guarantees
//!
//! - Rules and groups apply in declared order; earlier rules claim text first
//! - A bad pattern or a bad file is recorded and skipped, never fatal
//! - Dry-run computes the exact same statistics as a real run
//! - Writes are atomic (tempfile + fsync + rename) and stay inside the root
//!
//! # Example
//!
//! ```no_run
//! use cap_patcher::{run, Profile, RunConfig};
//! use std::path::Path;
//!
//! let config = RunConfig::new(Profile::Extended).dry_run(true);
//! match run(Path::new("proton/vkd3d-proton"), &config) {
//!     Ok(summary) => println!("{} matches", summary.stats.applied),
//!     Err(e) => eprintln!("run failed: {}", e),
//! }
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod discovery;
pub mod edit;
pub mod engine;
pub mod profile;
pub mod report;
pub mod rule;
pub mod run;
pub mod safety;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, DiscoveryConfig, RunConfig};
pub use discovery::{locate_target, DiscoveryError, FileFinder};
pub use engine::{
    rewrite, ChangeRecord, FileDiff, FileOutcome, FileRecord, PatchEngine, PatchError, RunStats,
};
pub use profile::Profile;
pub use report::{Report, ReportError};
pub use rule::{ensure_unique_ids, DuplicateRuleId, Rule, RuleGroup};
pub use run::{capability_groups, run, source_groups, RunError, RunSummary};
pub use safety::{RootGuard, SafetyError};
