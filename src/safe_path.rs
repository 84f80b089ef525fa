//! Root containment for every user-supplied path.
//!
//! All filesystem access in the crate goes through [`PathGuard::resolve`].
//! Callers hand in an untrusted, root-relative string; the guard returns a
//! canonical absolute path that is guaranteed to live inside the root, or an
//! error. Nothing else in the crate joins user input onto the root.
//!
//! Resolution happens in two passes:
//!
//! 1. **Lexical**: backslashes become slashes, empty and `.` segments are
//!    dropped, `..` pops the previous segment. Popping past the root is
//!    rejected before touching the filesystem.
//! 2. **Canonical**: the joined path is canonicalized, which resolves
//!    symlinks. The result must still have the root as a prefix, so a
//!    symlink pointing outside the tree is rejected as well.
//!
//! A missing target is [`GuardError::NotFound`]; every other
//! canonicalization failure is [`GuardError::AccessDenied`].

use crate::error::ErrorKind;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Access denied: {0}")]
    AccessDenied(String),
    #[error("Not found: {0}")]
    NotFound(String),
}

impl GuardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GuardError::AccessDenied(_) => ErrorKind::AccessDenied,
            GuardError::NotFound(_) => ErrorKind::NotFound,
        }
    }
}

/// Resolves relative paths against a fixed, canonical root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Canonicalize `root` once. Fails if the root does not exist.
    pub fn new(root: impl AsRef<Path>) -> io::Result<Self> {
        let root = root.as_ref().canonicalize()?;
        if !root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("library root is not a directory: {}", root.display()),
            ));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an untrusted relative path to a canonical path inside the root.
    ///
    /// The empty string resolves to the root itself.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, GuardError> {
        let segments = lexical_segments(relative)
            .ok_or_else(|| GuardError::AccessDenied(relative.to_string()))?;

        let mut joined = self.root.clone();
        joined.extend(&segments);

        match joined.canonicalize() {
            Ok(canonical) if canonical.starts_with(&self.root) => Ok(canonical),
            Ok(_) => Err(GuardError::AccessDenied(relative.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(GuardError::NotFound(relative.to_string()))
            }
            Err(_) => Err(GuardError::AccessDenied(relative.to_string())),
        }
    }

    /// Forward-slash relative form of a path inside the root.
    ///
    /// Returns `None` for paths outside the root.
    pub fn relative_of(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// Normalize a relative path to `a/b/c` form without consulting the filesystem.
///
/// Returns `None` when `..` climbs above the root or a segment would be
/// interpreted as an absolute path or drive prefix.
pub fn normalize_relative(relative: &str) -> Option<String> {
    lexical_segments(relative).map(|segments| segments.join("/"))
}

fn lexical_segments(relative: &str) -> Option<Vec<String>> {
    let slashed = relative.replace('\\', "/");
    let mut segments: Vec<String> = Vec::new();

    for segment in slashed.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => {
                let mut components = Path::new(other).components();
                match (components.next(), components.next()) {
                    (Some(Component::Normal(_)), None) => segments.push(other.to_string()),
                    _ => return None,
                }
            }
        }
    }

    Some(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathGuard) {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("Vacation/Day1")).unwrap();
        fs::write(tmp.path().join("Vacation/beach.jpg"), b"jpg").unwrap();
        let guard = PathGuard::new(tmp.path()).unwrap();
        (tmp, guard)
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let (_tmp, guard) = setup();
        assert_eq!(guard.resolve("").unwrap(), guard.root());
    }

    #[test]
    fn resolves_nested_file() {
        let (_tmp, guard) = setup();
        let path = guard.resolve("Vacation/beach.jpg").unwrap();
        assert_eq!(path, guard.root().join("Vacation").join("beach.jpg"));
    }

    #[test]
    fn backslashes_are_normalized() {
        let (_tmp, guard) = setup();
        let path = guard.resolve("Vacation\\beach.jpg").unwrap();
        assert!(path.ends_with("beach.jpg"));
    }

    #[test]
    fn dot_dot_inside_root_is_allowed() {
        let (_tmp, guard) = setup();
        let path = guard.resolve("Vacation/Day1/../beach.jpg").unwrap();
        assert!(path.ends_with("Vacation/beach.jpg"));
    }

    #[test]
    fn escaping_with_dot_dot_is_denied() {
        let (_tmp, guard) = setup();
        for attempt in ["..", "../etc/passwd", "Vacation/../../x", "a/../../..", "..\\..\\x"] {
            assert!(
                matches!(guard.resolve(attempt), Err(GuardError::AccessDenied(_))),
                "{attempt} should be denied"
            );
        }
    }

    #[test]
    fn leading_slash_stays_relative() {
        let (_tmp, guard) = setup();
        let path = guard.resolve("/Vacation").unwrap();
        assert_eq!(path, guard.root().join("Vacation"));
    }

    #[test]
    fn missing_path_is_not_found() {
        let (_tmp, guard) = setup();
        assert_eq!(
            guard.resolve("Vacation/nope.jpg"),
            Err(GuardError::NotFound("Vacation/nope.jpg".into()))
        );
    }

    #[test]
    fn sibling_with_root_prefix_is_denied() {
        let parent = TempDir::new().unwrap();
        fs::create_dir_all(parent.path().join("lib")).unwrap();
        fs::create_dir_all(parent.path().join("library-secret")).unwrap();
        let guard = PathGuard::new(parent.path().join("lib")).unwrap();
        assert!(matches!(
            guard.resolve("../library-secret"),
            Err(GuardError::AccessDenied(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escape_is_denied() {
        let (tmp, guard) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret.txt"), b"x").unwrap();
        std::os::unix::fs::symlink(outside.path(), tmp.path().join("escape")).unwrap();

        assert!(matches!(
            guard.resolve("escape/secret.txt"),
            Err(GuardError::AccessDenied(_))
        ));
    }

    #[test]
    fn relative_of_uses_forward_slashes() {
        let (_tmp, guard) = setup();
        let abs = guard.resolve("Vacation/beach.jpg").unwrap();
        assert_eq!(guard.relative_of(&abs).as_deref(), Some("Vacation/beach.jpg"));
        assert_eq!(guard.relative_of(guard.root()).as_deref(), Some(""));
    }

    #[test]
    fn normalize_relative_collapses_segments() {
        assert_eq!(normalize_relative("a//b/./c/").as_deref(), Some("a/b/c"));
        assert_eq!(normalize_relative("a/b/../c").as_deref(), Some("a/c"));
        assert_eq!(normalize_relative("").as_deref(), Some(""));
        assert_eq!(normalize_relative("../a"), None);
    }

    #[test]
    fn error_kinds() {
        assert_eq!(GuardError::AccessDenied("x".into()).kind(), ErrorKind::AccessDenied);
        assert_eq!(GuardError::NotFound("x".into()).kind(), ErrorKind::NotFound);
    }
}
