use crate::profile::Profile;
use serde::Deserialize;
use std::fmt;

/// Where to look for files and which ones to leave alone.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct DiscoveryConfig {
    /// File name of the capability-reporting source.
    pub capability_file: String,
    /// Subdirectories of the root tried in order by the target locator.
    pub candidate_dirs: Vec<String>,
    /// File-name glob for the build-flags pass.
    pub source_glob: String,
    /// Directory names excluded at any depth.
    pub excluded_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            capability_file: "device.c".to_string(),
            candidate_dirs: vec!["libs/vkd3d".to_string(), "src".to_string(), ".".to_string()],
            source_glob: "*.[ch]".to_string(),
            excluded_dirs: vec![
                "tests".to_string(),
                "demos".to_string(),
                "include".to_string(),
                ".git".to_string(),
            ],
        }
    }
}

impl DiscoveryConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.capability_file.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "capability_file",
            });
        }
        if self.capability_file.contains(['/', '\\']) {
            issues.push(ValidationIssue::InvalidValue {
                field: "capability_file",
                message: "must be a file name, not a path".to_string(),
            });
        }
        if self.source_glob.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "source_glob",
            });
        } else if let Err(e) = glob::Pattern::new(&self.source_glob) {
            issues.push(ValidationIssue::InvalidValue {
                field: "source_glob",
                message: e.to_string(),
            });
        }
        if self.candidate_dirs.is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "candidate_dirs",
            });
        }
        if self.excluded_dirs.iter().any(|d| d.trim().is_empty()) {
            issues.push(ValidationIssue::InvalidValue {
                field: "excluded_dirs",
                message: "entries must be non-empty".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

/// Everything one run needs besides the root path.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub profile: Profile,
    /// Apply the identity-override group to capability files.
    pub identity_override: bool,
    /// Compute everything, write nothing.
    pub dry_run: bool,
    /// Keep before/after content of changed files.
    pub capture_diffs: bool,
    pub discovery: DiscoveryConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            identity_override: true,
            dry_run: false,
            capture_diffs: false,
            discovery: DiscoveryConfig::default(),
        }
    }
}

impl RunConfig {
    pub fn new(profile: Profile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn identity_override(mut self, enabled: bool) -> Self {
        self.identity_override = enabled;
        self
    }

    pub fn capture_diffs(mut self, enabled: bool) -> Self {
        self.capture_diffs = enabled;
        self
    }

    pub fn discovery(mut self, discovery: DiscoveryConfig) -> Self {
        self.discovery = discovery;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.issues.iter().map(|i| i.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationError {}

impl ValidationIssue {
    /// The discovery key the issue is about.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationIssue::MissingField { field }
            | ValidationIssue::InvalidValue { field, .. } => *field,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => write!(f, "missing field `{field}`"),
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "invalid `{field}`: {message}")
            }
        }
    }
}
