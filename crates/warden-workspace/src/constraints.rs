//! Checking a tool call's parameters against its sandbox constraints.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use warden_core::SandboxConstraints;
use warden_core::params::{content_param, path_param, url_param};

use crate::canonical::canonicalize;
use crate::error::WorkspaceError;
use crate::rules::{PathRules, RuleCheck, UrlRules};

/// A sandbox constraint that a request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// The path parameter is malformed.
    #[error("{0}")]
    InvalidPath(WorkspaceError),

    /// The path matched no allow rule.
    #[error("path '{path}' is outside the allowed paths")]
    PathNotAllowed {
        /// Canonical path.
        path: String,
    },

    /// The path matched an exclusion.
    #[error("path '{path}' is excluded by '{rule}'")]
    PathExcluded {
        /// Canonical path.
        path: String,
        /// Exclusion that matched.
        rule: String,
    },

    /// The tool allows no paths at all.
    #[error("path '{path}' denied: tool has no allowed paths")]
    NoAllowedPaths {
        /// Canonical path.
        path: String,
    },

    /// The URL parameter is malformed or uses a forbidden scheme.
    #[error("{0}")]
    InvalidUrl(WorkspaceError),

    /// The URL matched no allow rule.
    #[error("url '{url}' is outside the allowed urls")]
    UrlNotAllowed {
        /// Normalized URL.
        url: String,
    },

    /// The URL matched an exclusion.
    #[error("url '{url}' is excluded by '{rule}'")]
    UrlExcluded {
        /// Normalized URL.
        url: String,
        /// Exclusion that matched.
        rule: String,
    },

    /// The tool allows no URLs at all.
    #[error("url '{url}' denied: tool has no allowed urls")]
    NoAllowedUrls {
        /// The URL.
        url: String,
    },

    /// Content is larger than `max_file_size`.
    #[error("content size {size} bytes exceeds max_file_size of {max} bytes")]
    ContentTooLarge {
        /// Actual size.
        size: u64,
        /// Configured limit.
        max: u64,
    },

    /// An allow rule in the policy itself is broken.
    #[error("policy rule error: {0}")]
    BadRule(WorkspaceError),
}

impl Violation {
    /// Whether this is malformed input rather than a policy refusal.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidPath(_) | Self::InvalidUrl(_))
    }
}

/// The canonical forms of a request's checked parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckedRequest {
    /// Canonical path, if the request named one.
    pub path: Option<PathBuf>,
    /// Normalized URL, if the request named one.
    pub url: Option<String>,
}

/// Canonicalize `raw` and check it against `allowed_paths`.
///
/// # Errors
///
/// Returns the violated constraint.
pub fn check_path(
    constraints: &SandboxConstraints,
    raw: &str,
    base: &Path,
) -> Result<PathBuf, Violation> {
    let path = canonicalize(raw, base).map_err(Violation::InvalidPath)?;
    let rules = PathRules::compile(&constraints.allowed_paths).map_err(Violation::BadRule)?;
    let shown = path.display().to_string();

    match rules.check(&path) {
        RuleCheck::Allowed { rule } => {
            debug!(path = %shown, rule = %rule, "Path allowed");
            Ok(path)
        },
        RuleCheck::Excluded { rule } => Err(Violation::PathExcluded { path: shown, rule }),
        RuleCheck::NotAllowed => Err(Violation::PathNotAllowed { path: shown }),
        RuleCheck::NoRules => Err(Violation::NoAllowedPaths { path: shown }),
    }
}

/// Check a URL against `allowed_urls`.
///
/// # Errors
///
/// Returns the violated constraint.
pub fn check_url(constraints: &SandboxConstraints, raw: &str) -> Result<String, Violation> {
    let rules = UrlRules::compile(&constraints.allowed_urls).map_err(Violation::BadRule)?;
    let url = crate::rules::parse_url(raw)
        .map_err(Violation::InvalidUrl)?
        .to_string();

    match rules.check(&url).map_err(Violation::InvalidUrl)? {
        RuleCheck::Allowed { .. } => Ok(url),
        RuleCheck::Excluded { rule } => Err(Violation::UrlExcluded { url, rule }),
        RuleCheck::NotAllowed => Err(Violation::UrlNotAllowed { url }),
        RuleCheck::NoRules => Err(Violation::NoAllowedUrls { url }),
    }
}

/// Check a payload length against `max_file_size`.
///
/// # Errors
///
/// Returns [`Violation::ContentTooLarge`] when the limit is exceeded.
pub fn check_size(constraints: &SandboxConstraints, len: usize) -> Result<(), Violation> {
    let Some(max) = constraints.max_file_size else {
        return Ok(());
    };
    let size = u64::try_from(len).unwrap_or(u64::MAX);
    if size > max {
        return Err(Violation::ContentTooLarge { size, max });
    }
    Ok(())
}

/// Check every constrained parameter of a request.
///
/// Paths are looked up under `path` / `file_path`, URLs under `url` and
/// content under `content`. Parameters that are absent are not checked.
///
/// # Errors
///
/// Returns the first violated constraint.
pub fn check_request(
    constraints: &SandboxConstraints,
    params: &Value,
    base: &Path,
) -> Result<CheckedRequest, Violation> {
    let mut checked = CheckedRequest::default();

    if let Some(raw) = path_param(params) {
        checked.path = Some(check_path(constraints, raw, base)?);
    }
    if let Some(raw) = url_param(params) {
        checked.url = Some(check_url(constraints, raw)?);
    }
    if let Some(content) = content_param(params) {
        check_size(constraints, content.len())?;
    }

    Ok(checked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn constraints(paths: &[&str]) -> SandboxConstraints {
        SandboxConstraints {
            allowed_paths: paths.iter().map(ToString::to_string).collect(),
            allowed_urls: vec!["https://example.com/**".to_string()],
            max_file_size: Some(10),
        }
    }

    #[test]
    fn test_path_allowed_and_canonical() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let c = constraints(&[&format!("{}/**", root.display()), "!**/.env"]);

        let checked = check_request(&c, &json!({"path": "src/../out.txt"}), &root).unwrap();
        assert_eq!(checked.path, Some(root.join("out.txt")));
    }

    #[test]
    fn test_path_excluded_names_rule() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let c = constraints(&[&format!("{}/**", root.display()), "!**/.env"]);

        let err = check_request(&c, &json!({"file_path": ".env"}), &root).unwrap_err();
        assert!(matches!(err, Violation::PathExcluded { ref rule, .. } if rule == "!**/.env"));
        assert!(err.to_string().contains("!**/.env"));
        assert!(!err.is_validation());
    }

    #[test]
    fn test_traversal_outside_root_denied() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let c = constraints(&[&root.display().to_string()]);

        let err = check_request(&c, &json!({"path": "../../../../etc/passwd"}), &root);
        assert!(matches!(err, Err(Violation::PathNotAllowed { .. })));
    }

    #[test]
    fn test_empty_allowed_paths_denies() {
        let c = constraints(&[]);
        let err = check_request(&c, &json!({"path": "/tmp/x"}), Path::new("/")).unwrap_err();
        assert!(matches!(err, Violation::NoAllowedPaths { .. }));
    }

    #[test]
    fn test_invalid_path_is_validation() {
        let c = constraints(&["/**"]);
        let err = check_request(&c, &json!({"path": ""}), Path::new("/")).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_url_checks() {
        let c = constraints(&[]);
        let ok = check_request(&c, &json!({"url": "https://example.com/a"}), Path::new("/"));
        assert_eq!(ok.unwrap().url.as_deref(), Some("https://example.com/a"));

        let denied = check_request(&c, &json!({"url": "https://other.com/"}), Path::new("/"));
        assert!(matches!(denied, Err(Violation::UrlNotAllowed { .. })));

        let bad = check_request(&c, &json!({"url": "data:text/html,hi"}), Path::new("/"));
        assert!(bad.unwrap_err().is_validation());
    }

    #[test]
    fn test_content_size() {
        let c = constraints(&[]);
        assert!(check_request(&c, &json!({"content": "0123456789"}), Path::new("/")).is_ok());
        let err = check_request(&c, &json!({"content": "0123456789A"}), Path::new("/"));
        assert_eq!(
            err.unwrap_err(),
            Violation::ContentTooLarge { size: 11, max: 10 }
        );
        assert!(check_size(&SandboxConstraints::default(), usize::MAX).is_ok());
    }

    #[test]
    fn test_no_constrained_params() {
        let c = constraints(&[]);
        let checked = check_request(&c, &json!({"command": "ls"}), Path::new("/")).unwrap();
        assert_eq!(checked, CheckedRequest::default());
    }
}
