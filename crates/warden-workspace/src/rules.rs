//! Allow-lists for paths and URLs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

use crate::canonical::canonicalize_entry;
use crate::error::{WorkspaceError, WorkspaceResult};
use crate::pattern::{Pattern, PatternSet, has_glob_operator};

/// URL schemes a browser tool may be pointed at.
pub const ALLOWED_SCHEMES: [&str; 3] = ["http", "https", "file"];

/// Outcome of checking a candidate against an allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "result")]
pub enum RuleCheck {
    /// Matched a positive rule and no exclusion.
    Allowed {
        /// The rule that matched.
        rule: String,
    },
    /// Matched an exclusion.
    Excluded {
        /// The exclusion that matched.
        rule: String,
    },
    /// Matched no positive rule.
    NotAllowed,
    /// The allow-list has no positive rules at all.
    NoRules,
}

impl RuleCheck {
    /// Whether the candidate is authorized.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }
}

/// Compiled `allowed_paths` entries.
///
/// Entries with glob operators are matched as patterns against the
/// canonical path. Plain entries are directories that cover themselves and
/// their strict descendants.
#[derive(Debug, Clone, Default)]
pub struct PathRules {
    globs: PatternSet,
    dirs: Vec<PathBuf>,
    excluded_dirs: Vec<PathBuf>,
}

impl PathRules {
    /// Compile allow entries.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::InvalidPattern`] for an empty entry.
    pub fn compile<S: AsRef<str>>(entries: &[S]) -> WorkspaceResult<Self> {
        let mut globs = Vec::new();
        let mut dirs = Vec::new();
        let mut excluded_dirs = Vec::new();

        for entry in entries {
            let entry = entry.as_ref();
            let (negated, body) = match entry.strip_prefix('!') {
                Some(rest) => (true, rest),
                None => (false, entry),
            };
            if body.is_empty() {
                return Err(WorkspaceError::InvalidPattern {
                    pattern: entry.to_string(),
                    reason: "empty pattern".to_string(),
                });
            }

            if has_glob_operator(body) {
                let body = canonicalize_glob_prefix(body);
                globs.push(if negated { format!("!{body}") } else { body });
            } else if negated {
                excluded_dirs.push(canonicalize_entry(body));
            } else {
                dirs.push(canonicalize_entry(body));
            }
        }

        Ok(Self {
            globs: PatternSet::compile(&globs)?,
            dirs,
            excluded_dirs,
        })
    }

    /// Check an already-canonical path.
    #[must_use]
    pub fn check(&self, path: &Path) -> RuleCheck {
        let candidate = path.to_string_lossy();

        if let Some(p) = self.globs.excluded_by(&candidate) {
            return excluded(p);
        }
        if let Some(dir) = self.excluded_dirs.iter().find(|d| covers(d, &candidate)) {
            return RuleCheck::Excluded {
                rule: format!("!{}", dir.display()),
            };
        }
        if self.globs.is_empty() && self.dirs.is_empty() {
            return RuleCheck::NoRules;
        }
        if let Some(p) = self.globs.matches(&candidate) {
            return RuleCheck::Allowed {
                rule: p.as_str().to_string(),
            };
        }
        if let Some(dir) = self.dirs.iter().find(|d| covers(d, &candidate)) {
            return RuleCheck::Allowed {
                rule: dir.display().to_string(),
            };
        }

        debug!(path = %candidate, "Path matched no allow rule");
        RuleCheck::NotAllowed
    }
}

fn excluded(p: &Pattern) -> RuleCheck {
    RuleCheck::Excluded {
        rule: p.as_str().to_string(),
    }
}

/// Directory equality or strict descent, compared with a trailing separator
/// so `/allowed-other` is not inside `/allowed`.
fn covers(dir: &Path, candidate: &str) -> bool {
    let dir = dir.to_string_lossy();
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        return candidate.starts_with('/');
    }
    candidate == dir
        || candidate
            .strip_prefix(dir)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Resolve the literal directory prefix of an absolute glob through
/// symlinks, leaving the operator-bearing tail as written.
fn canonicalize_glob_prefix(glob: &str) -> String {
    if !glob.starts_with('/') {
        return glob.to_string();
    }
    let first_op = glob.find(['*', '?']).unwrap_or(glob.len());
    let Some(slash) = glob[..first_op].rfind('/') else {
        return glob.to_string();
    };
    let (dir, tail) = glob.split_at(slash);
    if dir.is_empty() {
        return glob.to_string();
    }
    let resolved = canonicalize_entry(dir);
    let resolved = resolved.to_string_lossy();
    format!("{}{tail}", resolved.trim_end_matches('/'))
}

/// Compiled `allowed_urls` entries.
#[derive(Debug, Clone, Default)]
pub struct UrlRules {
    patterns: PatternSet,
}

impl UrlRules {
    /// Compile URL patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::InvalidPattern`] for an empty entry.
    pub fn compile<S: AsRef<str>>(entries: &[S]) -> WorkspaceResult<Self> {
        Ok(Self {
            patterns: PatternSet::compile(entries)?,
        })
    }

    /// Parse `raw`, require an allowed scheme, and check the normalized form.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::InvalidUrl`] if the URL does not parse or its
    /// scheme is not one of [`ALLOWED_SCHEMES`].
    pub fn check(&self, raw: &str) -> WorkspaceResult<RuleCheck> {
        let url = parse_url(raw)?;
        let candidate = url.as_str();

        if let Some(p) = self.patterns.excluded_by(candidate) {
            return Ok(excluded(p));
        }
        if self.patterns.is_empty() {
            return Ok(RuleCheck::NoRules);
        }
        Ok(match self.patterns.matches(candidate) {
            Some(p) => RuleCheck::Allowed {
                rule: p.as_str().to_string(),
            },
            None => RuleCheck::NotAllowed,
        })
    }
}

/// Parse a URL, require one of [`ALLOWED_SCHEMES`] and reject embedded
/// credentials.
///
/// Userinfo is refused so that a host pattern such as
/// `http://localhost:*/**` cannot match `http://localhost:1@other.host/`.
///
/// # Errors
///
/// Returns [`WorkspaceError::InvalidUrl`] on parse failure, a forbidden
/// scheme, or a URL carrying a username or password.
pub fn parse_url(raw: &str) -> WorkspaceResult<Url> {
    let url = Url::parse(raw).map_err(|e| WorkspaceError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(WorkspaceError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("scheme '{}' is not allowed", url.scheme()),
        });
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(WorkspaceError::InvalidUrl {
            url: raw.to_string(),
            reason: "credentials are not allowed in urls".to_string(),
        });
    }
    Ok(url)
}
