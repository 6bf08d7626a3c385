//! Path canonicalization.
//!
//! Unlike [`std::fs::canonicalize`], this works for paths that do not exist
//! yet (the target of a write): the longest existing ancestor is resolved
//! through symlinks and the remaining components are appended to it.

use std::path::{Component, Path, PathBuf};
use tracing::trace;

use crate::error::{WorkspaceError, WorkspaceResult};

/// Canonicalize `raw` to an absolute path.
///
/// Relative paths are resolved against `base`. `.` and `..` are folded
/// lexically, so `..` never climbs above the filesystem root.
///
/// # Errors
///
/// Returns [`WorkspaceError::InvalidPath`] for empty input or input
/// containing NUL bytes.
pub fn canonicalize(raw: &str, base: &Path) -> WorkspaceResult<PathBuf> {
    if raw.trim().is_empty() {
        return Err(invalid(raw, "empty path"));
    }
    if raw.contains('\0') {
        return Err(invalid(raw, "path contains a NUL byte"));
    }

    let path = Path::new(raw);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    };
    let normalized = normalize(&joined);
    let resolved = resolve_existing_prefix(&normalized);

    trace!(raw, resolved = %resolved.display(), "Canonicalized path");
    Ok(resolved)
}

/// Canonicalize an allow entry the same way request paths are, so both
/// sides of a comparison go through the same symlink resolution.
pub(crate) fn canonicalize_entry(entry: &str) -> PathBuf {
    let path = Path::new(entry);
    if !path.is_absolute() {
        return path.to_path_buf();
    }
    resolve_existing_prefix(&normalize(path))
}

fn invalid(raw: &str, reason: &str) -> WorkspaceError {
    WorkspaceError::InvalidPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(p) => out.push(p.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {},
            Component::ParentDir => {
                out.pop();
            },
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

fn resolve_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut tail: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if let Ok(real) = existing.canonicalize() {
            let mut resolved = real;
            for part in tail.iter().rev() {
                resolved.push(part);
            }
            return resolved;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name);
                existing = parent;
            },
            _ => return path.to_path_buf(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_empty_and_nul() {
        let base = Path::new("/");
        assert!(canonicalize("", base).is_err());
        assert!(canonicalize("   ", base).is_err());
        assert!(canonicalize("a\0b", base).is_err());
    }

    #[test]
    fn test_relative_resolves_against_base() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let p = canonicalize("sub/new.txt", &root).unwrap();
        assert_eq!(p, root.join("sub/new.txt"));
    }

    #[test]
    fn test_dot_dot_is_folded() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let p = canonicalize("a/../b/./c.txt", &root).unwrap();
        assert_eq!(p, root.join("b/c.txt"));

        let escaped = canonicalize("../../../../../../../../etc/passwd", &root).unwrap();
        assert_eq!(escaped, PathBuf::from("/etc/passwd"));
    }

    #[test]
    fn test_existing_file_is_resolved() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        std::fs::write(root.join("f.txt"), "x").unwrap();
        let p = canonicalize(root.join("f.txt").to_str().unwrap(), Path::new("/")).unwrap();
        assert_eq!(p, root.join("f.txt"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_parent_is_resolved() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let outside = TempDir::new().unwrap();
        let outside_root = outside.path().canonicalize().unwrap();
        std::os::unix::fs::symlink(&outside_root, root.join("link")).unwrap();

        let p = canonicalize("link/secret.txt", &root).unwrap();
        assert_eq!(p, outside_root.join("secret.txt"));
    }
}
