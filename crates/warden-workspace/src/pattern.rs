//! Glob patterns with negation.
//!
//! Patterns are translated to anchored regular expressions. Only `**`, `*`
//! and `?` are operators; every other character, including `[`, `{` and
//! regex metacharacters, is escaped and matched literally.

use regex::Regex;
use std::fmt;

use crate::error::{WorkspaceError, WorkspaceResult};

/// A single compiled pattern.
#[derive(Clone)]
pub struct Pattern {
    source: String,
    negated: bool,
    regex: Regex,
}

impl Pattern {
    /// Compile a pattern. A leading `!` marks it as an exclusion.
    ///
    /// # Errors
    ///
    /// Returns [`WorkspaceError::InvalidPattern`] for an empty pattern.
    pub fn new(pattern: &str) -> WorkspaceResult<Self> {
        let (negated, body) = match pattern.strip_prefix('!') {
            Some(rest) => (true, rest),
            None => (false, pattern),
        };
        if body.is_empty() {
            return Err(WorkspaceError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: "empty pattern".to_string(),
            });
        }
        let regex =
            Regex::new(&glob_to_regex(body)).map_err(|e| WorkspaceError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            negated,
            regex,
        })
    }

    /// The pattern as written, including any leading `!`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether this is an exclusion pattern.
    #[must_use]
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Whether the pattern body matches `candidate`, ignoring negation.
    #[must_use]
    pub fn is_match(&self, candidate: &str) -> bool {
        self.regex.is_match(candidate)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pattern({:?})", self.source)
    }
}

/// Whether `s` contains any glob operator.
#[must_use]
pub fn has_glob_operator(s: &str) -> bool {
    s.contains(['*', '?'])
}

fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len().saturating_mul(2).saturating_add(2));
    out.push('^');
    let mut rest = glob;
    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("**/") {
            out.push_str("(?:.*/)?");
            rest = after;
        } else if let Some(after) = rest.strip_prefix("**") {
            out.push_str(".*");
            rest = after;
        } else if let Some(after) = rest.strip_prefix('*') {
            out.push_str("[^/]*");
            rest = after;
        } else if let Some(after) = rest.strip_prefix('?') {
            out.push_str("[^/]");
            rest = after;
        } else {
            let mut buf = [0u8; 4];
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
            rest = &rest[c.len_utf8()..];
        }
    }
    out.push('$');
    out
}

/// Positive patterns minus negations.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PatternSet {
    /// Compile a list of patterns.
    ///
    /// # Errors
    ///
    /// Returns the first pattern that fails to compile.
    pub fn compile<S: AsRef<str>>(patterns: &[S]) -> WorkspaceResult<Self> {
        let mut set = Self::default();
        for p in patterns {
            let pattern = Pattern::new(p.as_ref())?;
            if pattern.is_negated() {
                set.exclude.push(pattern);
            } else {
                set.include.push(pattern);
            }
        }
        Ok(set)
    }

    /// The first positive pattern matching `candidate`, provided no exclusion
    /// matches it.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> Option<&Pattern> {
        if self.excluded_by(candidate).is_some() {
            return None;
        }
        self.include.iter().find(|p| p.is_match(candidate))
    }

    /// The first exclusion pattern matching `candidate`.
    #[must_use]
    pub fn excluded_by(&self, candidate: &str) -> Option<&Pattern> {
        self.exclude.iter().find(|p| p.is_match(candidate))
    }

    /// Whether the set has no positive patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }
}
