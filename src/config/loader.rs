//! Discovery settings from a TOML file.
//!
//! Syntax and schema errors point at the line they were found on; semantic
//! errors name every discovery key that failed validation.

use crate::config::schema::{DiscoveryConfig, ValidationIssue};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Malformed TOML, a value of the wrong type, or an unknown key.
    #[error("config syntax error{}{}: {message}", origin(.path), at_line(.line))]
    Syntax {
        path: Option<PathBuf>,
        /// 1-based line of the offending span, when the parser reports one
        line: Option<usize>,
        message: String,
    },

    #[error("invalid config{}: {}", origin(.path), describe(.issues))]
    Invalid {
        path: Option<PathBuf>,
        issues: Vec<ValidationIssue>,
    },
}

impl ConfigError {
    /// Discovery keys rejected by validation, in the order they were checked.
    pub fn invalid_keys(&self) -> Vec<&'static str> {
        match self {
            ConfigError::Invalid { issues, .. } => {
                issues.iter().map(ValidationIssue::field).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn origin(path: &Option<PathBuf>) -> String {
    path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default()
}

fn at_line(line: &Option<usize>) -> String {
    line.map(|n| format!(" at line {n}")).unwrap_or_default()
}

fn describe(issues: &[ValidationIssue]) -> String {
    let parts: Vec<String> = issues.iter().map(ToString::to_string).collect();
    parts.join("; ")
}

fn line_of(input: &str, offset: usize) -> usize {
    let end = offset.min(input.len());
    input.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

fn parse(input: &str, path: Option<&Path>) -> Result<DiscoveryConfig, ConfigError> {
    let config: DiscoveryConfig =
        toml_edit::de::from_str(input).map_err(|e| ConfigError::Syntax {
            path: path.map(Path::to_path_buf),
            line: e.span().map(|span| line_of(input, span.start)),
            message: e.message().to_string(),
        })?;

    config.validate().map_err(|e| ConfigError::Invalid {
        path: path.map(Path::to_path_buf),
        issues: e.issues,
    })?;

    Ok(config)
}

/// Parse discovery settings. Missing keys keep their defaults.
pub fn load_from_str(input: &str) -> Result<DiscoveryConfig, ConfigError> {
    parse(input, None)
}

/// Read and parse a discovery config file; errors carry `path`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<DiscoveryConfig, ConfigError> {
    let path = path.as_ref();
    let input = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&input, Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_gives_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, DiscoveryConfig::default());
    }

    #[test]
    fn test_partial_override() {
        let config = load_from_str(
            r#"
capability_file = "caps.c"
excluded_dirs = ["tests", "third_party"]
"#,
        )
        .unwrap();
        assert_eq!(config.capability_file, "caps.c");
        assert_eq!(config.excluded_dirs, ["tests", "third_party"]);
        assert_eq!(config.source_glob, "*.[ch]");
    }

    #[test]
    fn test_unknown_key_reports_line() {
        let input = "capability_file = \"a.c\"\ncapabilty_file = \"x.c\"\n";
        let err = load_from_str(input).unwrap_err();
        match &err {
            ConfigError::Syntax { path, line, message } => {
                assert!(path.is_none());
                assert_eq!(*line, Some(2));
                assert!(message.contains("capabilty_file"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().starts_with("config syntax error at line 2:"));
    }

    #[test]
    fn test_wrong_type_is_syntax_error() {
        let err = load_from_str("candidate_dirs = \"src\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Syntax { line: Some(1), .. }));
        assert!(err.invalid_keys().is_empty());
    }

    #[test]
    fn test_invalid_names_every_failing_key() {
        let err = load_from_str("capability_file = \"\"\nsource_glob = \"[\"\n").unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["capability_file", "source_glob"]);

        let text = err.to_string();
        assert!(text.starts_with("invalid config: "));
        assert!(text.contains("`source_glob`"));
    }

    #[test]
    fn test_invalid_carries_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patcher.toml");
        fs::write(&path, "candidate_dirs = []\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert_eq!(err.invalid_keys(), vec!["candidate_dirs"]);
        match err {
            ConfigError::Invalid { path: Some(p), .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_path("/nonexistent/patcher.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read config /nonexistent/patcher.toml"));
    }
}
