//! # rawshelf
//!
//! The storage side of a self-hosted photo browser. A directory of photos
//! (the *library root*) is browsed over the network: folders are listed,
//! images are shown as cached JPEG previews, originals can be downloaded, and
//! a selection can be exported as a zip, optionally swapping each image for
//! its sibling Sony `.ARW` RAW file.
//!
//! HTTP routing and the UI live elsewhere. This crate is what they call into.
//!
//! # Data Flow
//!
//! ```text
//! list      path  →  PathGuard  →  DirectoryLister  →  Listing (JSON-ready)
//! preview   path  →  PathGuard  →  PreviewCache ─hit→  JPEG bytes
//!                                       └─miss→  ImageBackend  →  store  →  JPEG bytes
//! export    paths →  PathGuard (each)  →  ArchiveExporter  →  ArchiveStream (temp zip)
//! warmup    root  →  walk  →  PreviewGenerator (bounded pool)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`safe_path`] | `PathGuard`: every user path is resolved here and must stay inside the root |
//! | [`listing`] | One-level directory listing with image/RAW pairing and breadcrumbs |
//! | [`cache`] | Content-addressed on-disk preview store with atomic writes |
//! | [`preview`] | Cache-first preview generation with per-key in-flight de-duplication |
//! | [`imaging`] | Pure-Rust decode, orient, fit and JPEG encode behind the `ImageBackend` trait |
//! | [`warmup`] | Startup crawl that pre-renders previews on a bounded pool |
//! | [`archive`] | Zip export with RAW substitution, built in a self-deleting temp file |
//! | [`fetch`] | Original-file downloads with content type and disposition |
//! | [`library`] | `Library`, one handle over all of the above for a loaded config |
//! | [`config`] | `config.toml` loading, merging over stock defaults, validation |
//! | [`error`] | `ErrorKind`, the coarse failure category every module error maps to |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## One Guard
//!
//! There is exactly one function that turns user input into a filesystem
//! path: [`safe_path::PathGuard::resolve`]. It normalizes lexically, then
//! canonicalizes and checks the root prefix, so both `../` sequences and
//! symlinks pointing out of the tree are refused. Listing, previews,
//! downloads, exports and the warmup crawl all share the same guard.
//!
//! ## Previews Are Rendered Once
//!
//! A preview is addressed by a SHA-256 of the resolved source path and the
//! size variant. Entries are written to a temp file and renamed into place,
//! and concurrent requests for the same missing preview share a single render.
//! There is no invalidation: editing a photo in place keeps the old preview
//! until the cache directory is cleared.
//!
//! ## Exports Clean Up After Themselves
//!
//! An export is a zip in a named temp file owned by the returned
//! [`archive::ArchiveStream`]. Finishing the download, abandoning it, or an
//! error while building all end the same way: the value is dropped and the
//! file is deleted.

pub mod archive;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod imaging;
pub mod library;
pub mod listing;
pub mod output;
pub mod preview;
pub mod safe_path;
pub mod warmup;

pub use error::ErrorKind;
pub use library::Library;

#[cfg(test)]
pub(crate) mod test_helpers;
