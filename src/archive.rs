//! Zip export of a selection of library files.
//!
//! An export turns a list of root-relative paths into a single deflated zip.
//! With `raw` set, each image is swapped for its sibling `.ARW` file, so a
//! user can pick photos by their previews and download the originals.
//!
//! The archive is assembled in a named temp file and handed back as an
//! [`ArchiveStream`]. The stream owns that file: whether the caller streams
//! it to the end, stops halfway, or never reads it, dropping the stream
//! deletes the file. Errors while building drop it the same way.
//!
//! Paths are resolved through the [`PathGuard`] one by one. A path that
//! escapes the root fails the whole export; a path that has merely vanished
//! is skipped with a warning.

use crate::error::ErrorKind;
use crate::listing::raw_name_for;
use crate::safe_path::{GuardError, PathGuard, normalize_relative};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;

/// Archive name used when the selection lives directly under the root.
pub const DEFAULT_ARCHIVE_NAME: &str = "files.zip";

pub const DEFAULT_COMPRESSION_LEVEL: i64 = 9;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("No files selected for export")]
    Empty,
    #[error(transparent)]
    Path(#[from] GuardError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Zip error: {0}")]
    Zip(#[from] ZipError),
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::Empty => ErrorKind::BadRequest,
            ArchiveError::Path(e) => e.kind(),
            ArchiveError::Io(_) | ArchiveError::Zip(_) => ErrorKind::WriteFailure,
        }
    }
}

/// What to put in the archive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportJob {
    /// Root-relative paths, archived in this order.
    pub paths: Vec<String>,
    /// Substitute each file with its `.ARW` sibling.
    pub raw: bool,
}

impl ExportJob {
    pub fn new(paths: impl IntoIterator<Item = impl Into<String>>, raw: bool) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Deflate level, 0 to 9.
    pub compression_level: i64,
    /// Where in-progress archives are written.
    pub temp_dir: PathBuf,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// A finished archive, readable from the start. Deleted on drop.
#[derive(Debug)]
pub struct ArchiveStream {
    file: NamedTempFile,
    len: u64,
    file_name: String,
    entries: Vec<String>,
}

impl ArchiveStream {
    /// Size of the archive in bytes, for a `Content-Length` header.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Suggested download name, see [`suggested_name`].
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Names of the archive entries, in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Location of the backing temp file.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Read for ArchiveStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

/// Build a zip of `job.paths` and return it as a stream.
pub fn export(
    guard: &PathGuard,
    job: &ExportJob,
    options: &ArchiveOptions,
) -> Result<ArchiveStream, ArchiveError> {
    if job.paths.is_empty() {
        return Err(ArchiveError::Empty);
    }

    let mut temp = tempfile::Builder::new()
        .prefix("export-")
        .suffix(".zip")
        .tempfile_in(&options.temp_dir)?;

    let base_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(options.compression_level));

    let mut names = EntryNames::default();
    let mut zip = ZipWriter::new(temp.as_file_mut());
    for relative in &job.paths {
        let Some((source, base_name)) = select_source(guard, relative, job.raw)? else {
            continue;
        };
        let mut input = File::open(&source)?;
        let size = input.metadata()?.len();
        let name = names.claim(&base_name);
        tracing::debug!(path = %relative, entry = %name, "adding to archive");

        zip.start_file(
            name.as_str(),
            base_options.large_file(size >= u64::from(u32::MAX)),
        )?;
        io::copy(&mut input, &mut zip)?;
    }
    zip.finish()?;

    let len = temp.as_file().metadata()?.len();
    temp.seek(SeekFrom::Start(0))?;

    let file_name = suggested_name(&job.paths);
    tracing::info!(
        archive = %file_name,
        requested = job.paths.len(),
        entries = names.order.len(),
        bytes = len,
        raw = job.raw,
        "export ready"
    );

    Ok(ArchiveStream {
        file: temp,
        len,
        file_name,
        entries: names.order,
    })
}

/// Download name for an export: the first path's parent folder plus `.zip`.
///
/// Falls back to [`DEFAULT_ARCHIVE_NAME`] when that parent is the root.
pub fn suggested_name(paths: &[String]) -> String {
    paths
        .first()
        .and_then(|first| normalize_relative(first))
        .and_then(|normalized| {
            let (parent, _) = normalized.rsplit_once('/')?;
            let folder = parent.rsplit('/').next()?;
            Some(format!("{folder}.zip"))
        })
        .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string())
}

/// The file to archive for `relative` and the entry name to give it.
///
/// `Ok(None)` means the path contributes nothing.
fn select_source(
    guard: &PathGuard,
    relative: &str,
    raw: bool,
) -> Result<Option<(PathBuf, String)>, ArchiveError> {
    let Some(source) = resolve_file(guard, relative)? else {
        tracing::warn!(path = %relative, "skipping export entry that is not a file");
        return Ok(None);
    };
    let base_name = match source_base_name(relative) {
        Some(name) => name,
        None => return Ok(None),
    };
    if !raw {
        return Ok(Some((source, base_name)));
    }

    let raw_name = raw_name_for(&base_name);
    let raw_relative = match normalize_relative(relative).and_then(|n| {
        n.rsplit_once('/').map(|(parent, _)| parent.to_string())
    }) {
        Some(parent) => format!("{parent}/{raw_name}"),
        None => raw_name.clone(),
    };
    match resolve_file(guard, &raw_relative)? {
        Some(raw_source) => Ok(Some((raw_source, raw_name))),
        None => {
            tracing::debug!(path = %relative, "no RAW sibling, leaving out");
            Ok(None)
        }
    }
}

/// Resolve to a regular file. Missing paths and non-files are `None`;
/// root escapes are errors.
fn resolve_file(guard: &PathGuard, relative: &str) -> Result<Option<PathBuf>, ArchiveError> {
    match guard.resolve(relative) {
        Ok(path) if path.is_file() => Ok(Some(path)),
        Ok(_) | Err(GuardError::NotFound(_)) => Ok(None),
        Err(e @ GuardError::AccessDenied(_)) => Err(e.into()),
    }
}

fn source_base_name(relative: &str) -> Option<String> {
    let normalized = normalize_relative(relative)?;
    let name = normalized.rsplit('/').next()?;
    (!name.is_empty()).then(|| name.to_string())
}

/// Hands out unique entry names: `a.jpg`, `a (2).jpg`, `a (3).jpg`.
#[derive(Default)]
struct EntryNames {
    taken: HashSet<String>,
    order: Vec<String>,
}

impl EntryNames {
    fn claim(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 2;
        while self.taken.contains(&candidate) {
            candidate = numbered(name, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        self.order.push(candidate.clone());
        candidate
    }
}

fn numbered(name: &str, n: u32) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({n}).{ext}"),
        _ => format!("{name} ({n})"),
    }
}
