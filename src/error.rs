//! Error classification shared by every component.
//!
//! Each module keeps its own `thiserror` enum with precise variants. The
//! route layer in front of the library only needs to know *which kind* of
//! failure happened so it can pick a status code and a message that leaks no
//! filesystem detail. Every module error exposes `kind()` returning an
//! [`ErrorKind`].

use std::fmt;

/// Coarse failure category visible to callers of the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The requested path escapes the library root.
    AccessDenied,
    /// The directory or file does not exist (or is the wrong type).
    NotFound,
    /// Malformed input, e.g. an empty export selection.
    BadRequest,
    /// Cache or archive I/O failed.
    WriteFailure,
    /// Decoding or re-encoding the source image failed.
    TransformFailure,
    /// Unknown size variant.
    InvalidArgument,
}

impl ErrorKind {
    /// HTTP status an external route layer should answer with.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::AccessDenied => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::BadRequest | ErrorKind::InvalidArgument => 400,
            ErrorKind::TransformFailure => 422,
            ErrorKind::WriteFailure => 500,
        }
    }

    /// A message safe to show to end users.
    pub fn public_message(self) -> &'static str {
        match self {
            ErrorKind::AccessDenied => "access denied",
            ErrorKind::NotFound => "not found",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::WriteFailure => "internal storage error",
            ErrorKind::TransformFailure => "image could not be processed",
            ErrorKind::InvalidArgument => "invalid argument",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.public_message())
    }
}
