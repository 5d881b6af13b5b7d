//! Persisted run report.
//!
//! Key names are part of the tool's interface; downstream scripts read them.

use crate::catalog;
use crate::engine::FileRecord;
use crate::profile::Profile;
use crate::run::RunSummary;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_REPORT_FILE: &str = "patch-report.json";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write report to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub version: &'static str,
    pub timestamp: String,
    pub config: ReportConfig,
    pub overrides: Overrides,
    pub stats: ReportStats,
    pub files: Vec<FileRecord>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportConfig {
    pub profile: Profile,
    pub identity_override: bool,
    pub dry_run: bool,
}

/// Headline values the rule catalog forces.
#[derive(Debug, Clone, Serialize)]
pub struct Overrides {
    pub shader_model: &'static str,
    pub feature_level: &'static str,
    pub gpu_identity: &'static str,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            shader_model: catalog::SHADER_MODEL,
            feature_level: catalog::FEATURE_LEVEL,
            gpu_identity: catalog::GPU_IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStats {
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: usize,
}

impl Report {
    pub fn from_summary(summary: &RunSummary) -> Self {
        Self::at(summary, Utc::now())
    }

    /// Build a report with an explicit timestamp.
    pub fn at(summary: &RunSummary, timestamp: DateTime<Utc>) -> Self {
        let stats = &summary.stats;
        Self {
            version: env!("CARGO_PKG_VERSION"),
            timestamp: timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            config: ReportConfig {
                profile: summary.profile,
                identity_override: summary.identity_override,
                dry_run: summary.dry_run,
            },
            overrides: Overrides::default(),
            stats: ReportStats {
                applied: stats.applied,
                skipped: stats.skipped,
                failed: stats.failed,
                errors: stats.errors.len(),
            },
            files: summary.files.clone(),
            errors: stats.errors.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        fs::write(path, json + "\n").map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
