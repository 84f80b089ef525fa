//! Original-file downloads.
//!
//! Opens a library file for streaming and works out the headers a route
//! layer should send with it. JPEGs requested as previews are shown inline;
//! everything else is offered as a download.

use crate::error::ErrorKind;
use crate::safe_path::{GuardError, PathGuard, normalize_relative};
use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;
use thiserror::Error;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const JPEG: &str = "image/jpeg";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Path(#[from] GuardError),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Path(e) => e.kind(),
            FetchError::NotAFile(_) => ErrorKind::NotFound,
            FetchError::Io(_) => ErrorKind::WriteFailure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Inline,
    Attachment,
}

impl Disposition {
    /// `Content-Disposition` value with a percent-encoded filename.
    ///
    /// ```
    /// use rawshelf::fetch::Disposition;
    /// assert_eq!(
    ///     Disposition::Attachment.header_value("my photo.ARW"),
    ///     r#"attachment; filename="my%20photo.ARW""#
    /// );
    /// ```
    pub fn header_value(self, file_name: &str) -> String {
        format!("{}; filename=\"{}\"", self, urlencoding::encode(file_name))
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Disposition::Inline => "inline",
            Disposition::Attachment => "attachment",
        })
    }
}

/// An opened library file plus the response metadata for it.
#[derive(Debug)]
pub struct FileDownload {
    pub file: File,
    pub len: u64,
    pub file_name: String,
    pub content_type: &'static str,
    pub disposition: Disposition,
}

impl FileDownload {
    pub fn content_disposition(&self) -> String {
        self.disposition.header_value(&self.file_name)
    }
}

/// Open `relative` for download.
///
/// `preview_hint` asks for inline display; it only takes effect for JPEGs.
pub fn open_file(
    guard: &PathGuard,
    relative: &str,
    preview_hint: bool,
) -> Result<FileDownload, FetchError> {
    let path = guard.resolve(relative)?;
    let metadata = path.metadata()?;
    if !metadata.is_file() {
        return Err(FetchError::NotAFile(relative.to_string()));
    }

    let file_name = normalize_relative(relative)
        .and_then(|normalized| normalized.rsplit('/').next().map(str::to_string))
        .filter(|name| !name.is_empty())
        .or_else(|| path.file_name().map(|n| n.to_string_lossy().into_owned()))
        .ok_or_else(|| FetchError::NotAFile(relative.to_string()))?;

    let (content_type, disposition) = if preview_hint && is_jpeg(&file_name) {
        (JPEG, Disposition::Inline)
    } else {
        (OCTET_STREAM, Disposition::Attachment)
    };

    tracing::debug!(path = %relative, %disposition, "serving file");
    Ok(FileDownload {
        file: File::open(&path)?,
        len: metadata.len(),
        file_name,
        content_type,
        disposition,
    })
}

fn is_jpeg(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}
