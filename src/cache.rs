//! Persistent preview cache.
//!
//! Decoding a 40-megapixel JPEG and re-encoding it at 2560px costs far more
//! than reading a few hundred kilobytes back from disk, so every generated
//! preview is stored and served from here on later requests.
//!
//! # Design
//!
//! ## Cache keys
//!
//! The cache is **content-addressed by request**: a [`CacheKey`] is the
//! SHA-256 of the resolved absolute source path and the size-variant name.
//! Two requests for the same file at the same variant always produce the
//! same key; the key never depends on anything the user can smuggle into a
//! filename, because it is a fixed-length hex digest.
//!
//! Entries are **never invalidated**. If a source image is edited in place,
//! the old preview keeps being served until the cache directory is cleared.
//! Bump [`CACHE_FORMAT_VERSION`] to orphan every existing entry when the key
//! computation or the preview encoding changes.
//!
//! ## Storage
//!
//! ```text
//! <cache_dir>/
//! ├── 3f/
//! │   └── 3fa2…e1      # one file per entry, named by the full digest
//! └── c0/
//!     └── c09d…7b
//! ```
//!
//! The two-character shard keeps directories small on large libraries.
//! Directories are created lazily on first write.
//!
//! ## Atomicity
//!
//! [`PreviewCache::put`] writes to a temp file inside the shard directory and
//! renames it over the final name. Readers either see the previous complete
//! entry or the new complete entry, never a partial write. Two writers racing
//! on the same key both rename a complete buffer; the last one wins, and
//! both buffers are identical anyway.

use crate::error::ErrorKind;
use sha2::{Digest, Sha256};
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Version of the key derivation. Bump to invalidate every cached preview.
pub const CACHE_FORMAT_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache read failed for {key}: {source}")]
    Read { key: String, source: io::Error },
    #[error("Cache write failed for {key}: {source}")]
    Write { key: String, source: io::Error },
}

impl CacheError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::WriteFailure
    }
}

/// Digest identifying one (source file, size variant) derivative.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key for `source` (an absolute, resolved path) at `variant`.
    pub fn derive(source: &Path, variant: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"preview\0");
        hasher.update(CACHE_FORMAT_VERSION.to_le_bytes());
        hasher.update(source.as_os_str().as_encoded_bytes());
        hasher.update(b"\0");
        hasher.update(variant.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn shard(&self) -> &str {
        &self.0[..2]
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Disk-backed store of preview buffers.
#[derive(Debug)]
pub struct PreviewCache {
    dir: PathBuf,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

impl PreviewCache {
    /// Open a cache rooted at `dir`. Nothing is created until the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a cached buffer. A missing entry is `Ok(None)`, not an error.
    pub fn get(&self, key: &CacheKey) -> Result<Option<Vec<u8>>, CacheError> {
        match std::fs::read(self.entry_path(key)) {
            Ok(bytes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
            Err(source) => Err(CacheError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    /// Store `bytes` under `key`, replacing any existing entry atomically.
    pub fn put(&self, key: &CacheKey, bytes: &[u8]) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            key: key.to_string(),
            source,
        };

        let shard_dir = self.dir.join(key.shard());
        std::fs::create_dir_all(&shard_dir).map_err(write_err)?;

        let mut tmp = NamedTempFile::new_in(&shard_dir).map_err(write_err)?;
        tmp.write_all(bytes).map_err(write_err)?;
        tmp.as_file().sync_data().map_err(write_err)?;
        tmp.persist(self.entry_path(key))
            .map_err(|e| write_err(e.error))?;

        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Snapshot of the hit/miss/write counters since the cache was opened.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.shard()).join(key.as_str())
    }
}

/// Summary of cache activity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

impl CacheStats {
    pub fn total(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits > 0 {
            write!(
                f,
                "{} cached, {} generated ({} total)",
                self.hits,
                self.writes,
                self.total()
            )
        } else {
            write!(f, "{} generated", self.writes)
        }
    }
}
