//! One-level directory listings with RAW pairing and breadcrumbs.
//!
//! A listing answers "what is in this folder?" for the browsing UI:
//!
//! ```text
//! Vacation/
//! ├── Day1/            → directory
//! ├── beach.jpg        → image, rawPairPath = "Vacation/beach.ARW"
//! ├── beach.ARW        → file
//! ├── sunset.png       → image, rawPairPath = null
//! └── notes.txt        → file
//! ```
//!
//! ## RAW pairing
//!
//! Cameras write a rendered JPEG next to the unprocessed `.ARW` file with the
//! same base name. The lister indexes the `.ARW` siblings of the folder
//! (case-insensitively) and points every image at its RAW counterpart when
//! one exists. Pairing never looks outside the listed folder.
//!
//! ## Ordering
//!
//! Entries come back in whatever order the filesystem yields them. Sorting
//! is a presentation concern; [`Listing::sort_for_display`] is provided for
//! callers that want the usual folders-first order.

use crate::error::ErrorKind;
use crate::safe_path::{GuardError, PathGuard, normalize_relative};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;

/// Extensions rendered as images (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Extension of the camera RAW files paired with images.
pub const RAW_EXTENSION: &str = "ARW";

#[derive(Error, Debug)]
pub enum ListError {
    #[error(transparent)]
    Path(#[from] GuardError),
    #[error("Not a directory: {0}")]
    NotADirectory(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ListError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ListError::Path(e) => e.kind(),
            ListError::NotADirectory(_) => ErrorKind::NotFound,
            ListError::Io(e) if e.kind() == io::ErrorKind::NotFound => ErrorKind::NotFound,
            ListError::Io(_) => ErrorKind::AccessDenied,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
    Image,
}

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsEntry {
    pub name: String,
    pub relative_path: String,
    pub kind: EntryKind,
    pub raw_pair_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub name: String,
    pub path: String,
}

/// Result of listing one directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Listing {
    pub content: Vec<FsEntry>,
    pub breadcrumbs: Vec<Breadcrumb>,
}

impl Listing {
    /// Directories first, then everything else, each group by case-insensitive name.
    pub fn sort_for_display(&mut self) {
        self.content.sort_by_key(|e| {
            (
                e.kind != EntryKind::Directory,
                e.name.to_lowercase(),
                e.name.clone(),
            )
        });
    }
}

/// List the immediate children of `relative`.
///
/// With `only_images`, plain files are dropped; directories stay so the
/// caller can keep navigating.
pub fn list(guard: &PathGuard, relative: &str, only_images: bool) -> Result<Listing, ListError> {
    let dir = guard.resolve(relative)?;
    if !dir.is_dir() {
        return Err(ListError::NotADirectory(relative.to_string()));
    }

    // Echo the requested path, not the canonical one; symlinked folders keep their name.
    let base = normalize_relative(relative).unwrap_or_default();

    let mut children: Vec<(String, EntryKind)> = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let is_dir = match entry.file_type() {
            Ok(ft) if ft.is_symlink() => entry.path().is_dir(),
            Ok(ft) => ft.is_dir(),
            Err(_) => continue,
        };
        let kind = if is_dir {
            EntryKind::Directory
        } else if is_image_name(&name) {
            EntryKind::Image
        } else {
            EntryKind::File
        };
        children.push((name, kind));
    }

    // lowercase RAW filename → actual filename
    let raw_siblings: HashMap<String, &str> = children
        .iter()
        .filter(|(name, kind)| *kind != EntryKind::Directory && is_raw_name(name))
        .map(|(name, _)| (name.to_lowercase(), name.as_str()))
        .collect();

    let content = children
        .iter()
        .filter(|(_, kind)| !only_images || *kind != EntryKind::File)
        .map(|(name, kind)| {
            let raw_pair_path = match kind {
                EntryKind::Image => raw_siblings
                    .get(&raw_name_for(name).to_lowercase())
                    .map(|raw| join_relative(&base, raw)),
                _ => None,
            };
            FsEntry {
                name: name.clone(),
                relative_path: join_relative(&base, name),
                kind: *kind,
                raw_pair_path,
            }
        })
        .collect();

    Ok(Listing {
        content,
        breadcrumbs: build_breadcrumbs(&base),
    })
}

/// Accumulate one breadcrumb per path segment. Empty for the root.
pub fn build_breadcrumbs(relative: &str) -> Vec<Breadcrumb> {
    let normalized = normalize_relative(relative).unwrap_or_default();
    let mut acc = String::new();

    normalized
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| {
            if !acc.is_empty() {
                acc.push('/');
            }
            acc.push_str(segment);
            Breadcrumb {
                name: segment.to_string(),
                path: acc.clone(),
            }
        })
        .collect()
}

/// Whether a filename has one of the [`IMAGE_EXTENSIONS`].
pub fn is_image_name(name: &str) -> bool {
    extension_of(name)
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn is_raw_name(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| ext.eq_ignore_ascii_case(RAW_EXTENSION))
}

/// `beach.jpg` → `beach.ARW`
pub fn raw_name_for(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    format!("{stem}.{RAW_EXTENSION}")
}

fn extension_of(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|e| e.to_str())
}

fn join_relative(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{base}/{name}")
    }
}
