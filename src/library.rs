//! One handle over a configured photo library.
//!
//! [`Library`] owns the [`PathGuard`], the [`PreviewGenerator`] (and with it
//! the cache) and the export settings, and exposes each operation a route
//! layer needs as one method. It is `Send + Sync`; share it behind an `Arc`.
//!
//! If the cache directory lives inside the library root it is hidden from
//! listings.

use crate::archive::{self, ArchiveError, ArchiveOptions, ArchiveStream, ExportJob};
use crate::cache::{CacheStats, PreviewCache};
use crate::config::{ShelfConfig, effective_threads};
use crate::fetch::{self, FetchError, FileDownload};
use crate::imaging::{ImageBackend, RustBackend};
use crate::listing::{self, ListError, Listing};
use crate::preview::{PreviewError, PreviewGenerator, SizeVariant};
use crate::safe_path::PathGuard;
use crate::warmup::{self, WarmupReport};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Cannot open library root {path}: {source}")]
    Root { path: PathBuf, source: io::Error },
    #[error("Cannot create cache directory {path}: {source}")]
    CacheDir { path: PathBuf, source: io::Error },
}

pub struct Library<B = RustBackend> {
    config: ShelfConfig,
    generator: Arc<PreviewGenerator<B>>,
    archive: ArchiveOptions,
    /// Root-relative location of the cache dir, when it sits inside the root.
    hidden: Option<String>,
}

impl Library<RustBackend> {
    /// Open the library described by `config` with the image-crate backend.
    pub fn open(config: ShelfConfig) -> Result<Self, LibraryError> {
        Self::with_backend(config, RustBackend::new())
    }
}

impl<B: ImageBackend + 'static> Library<B> {
    pub fn with_backend(config: ShelfConfig, backend: B) -> Result<Self, LibraryError> {
        let guard = PathGuard::new(&config.root).map_err(|source| LibraryError::Root {
            path: config.root.clone(),
            source,
        })?;

        let cache_dir_error = |source| LibraryError::CacheDir {
            path: config.cache_dir.clone(),
            source,
        };
        std::fs::create_dir_all(&config.cache_dir).map_err(cache_dir_error)?;
        let cache_dir = config.cache_dir.canonicalize().map_err(cache_dir_error)?;
        let hidden = guard.relative_of(&cache_dir).filter(|rel| !rel.is_empty());

        tracing::info!(
            root = %guard.root().display(),
            cache = %cache_dir.display(),
            "library opened"
        );

        let generator = PreviewGenerator::new(
            guard,
            PreviewCache::new(cache_dir),
            backend,
            config.variant_specs(),
        );
        Ok(Self {
            archive: config.archive_options(),
            config,
            generator: Arc::new(generator),
            hidden,
        })
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }

    pub fn guard(&self) -> &PathGuard {
        self.generator.guard()
    }

    pub fn generator(&self) -> &PreviewGenerator<B> {
        &self.generator
    }

    pub fn list(&self, relative: &str, only_images: bool) -> Result<Listing, ListError> {
        let mut listing = listing::list(self.guard(), relative, only_images)?;
        if let Some(hidden) = &self.hidden {
            listing.content.retain(|entry| &entry.relative_path != hidden);
        }
        Ok(listing)
    }

    pub fn preview(&self, relative: &str, variant: SizeVariant) -> Result<Vec<u8>, PreviewError> {
        self.generator.get_preview(relative, variant)
    }

    pub fn open_file(&self, relative: &str, preview_hint: bool) -> Result<FileDownload, FetchError> {
        fetch::open_file(self.guard(), relative, preview_hint)
    }

    pub fn export(&self, job: &ExportJob) -> Result<ArchiveStream, ArchiveError> {
        archive::export(self.guard(), job, &self.archive)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.generator.cache().stats()
    }

    /// Run the warmup crawl for `variants` and wait for it.
    pub fn warmup(&self, variants: &[SizeVariant]) -> WarmupReport {
        warmup::warmup(
            &self.generator,
            variants,
            effective_threads(&self.config.processing),
        )
    }

    /// Start the configured warmup crawl in the background.
    ///
    /// Returns `None` when warmup is disabled or has no sizes.
    pub fn spawn_warmup(&self) -> io::Result<Option<JoinHandle<WarmupReport>>> {
        let settings = &self.config.warmup;
        if !settings.enabled || settings.sizes.is_empty() {
            tracing::debug!("preview warmup disabled");
            return Ok(None);
        }
        warmup::spawn(
            Arc::clone(&self.generator),
            settings.sizes.clone(),
            effective_threads(&self.config.processing),
        )
        .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    fn config_for(root: &std::path::Path, cache: &std::path::Path) -> ShelfConfig {
        ShelfConfig {
            root: root.to_path_buf(),
            cache_dir: cache.to_path_buf(),
            ..ShelfConfig::default()
        }
    }

    #[test]
    fn open_missing_root_fails() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(&tmp.path().join("nope"), &tmp.path().join("cache"));
        let result = Library::with_backend(config, MockBackend::new());
        assert!(matches!(result, Err(LibraryError::Root { .. })));
    }

    #[test]
    fn open_creates_cache_dir() {
        let (lib, _) = library_with(&["a.jpg"]);
        let cache = TempDir::new().unwrap();
        let cache_dir = cache.path().join("nested/previews");

        Library::with_backend(config_for(lib.path(), &cache_dir), MockBackend::new()).unwrap();
        assert!(cache_dir.is_dir());
    }

    #[test]
    fn cache_dir_inside_root_is_hidden() {
        let (lib, _) = library_with(&["a.jpg", "Trips/b.jpg"]);
        let library = Library::with_backend(
            config_for(lib.path(), &lib.path().join(".cache")),
            MockBackend::new(),
        )
        .unwrap();

        let mut names: Vec<String> = library
            .list("", false)
            .unwrap()
            .content
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Trips", "a.jpg"]);
    }

    #[test]
    fn operations_share_one_guard() {
        let (lib, _) = library_with(&["a.jpg"]);
        let cache = TempDir::new().unwrap();
        let library =
            Library::with_backend(config_for(lib.path(), cache.path()), MockBackend::new()).unwrap();

        assert_eq!(library.list("..", false).unwrap_err().kind(), ErrorKind::AccessDenied);
        assert_eq!(
            library.preview("../a.jpg", SizeVariant::Small).unwrap_err().kind(),
            ErrorKind::AccessDenied
        );
        assert_eq!(library.open_file("../a.jpg", false).unwrap_err().kind(), ErrorKind::AccessDenied);
        assert_eq!(
            library.export(&ExportJob::new(["../a.jpg"], false)).unwrap_err().kind(),
            ErrorKind::AccessDenied
        );
    }

    #[test]
    fn preview_uses_configured_specs() {
        let (lib, _) = library_with(&["a.jpg"]);
        let cache = TempDir::new().unwrap();
        let mut config = config_for(lib.path(), cache.path());
        config.previews.small.max_edge = 123;
        let library = Library::with_backend(config, MockBackend::new()).unwrap();

        let bytes = library.preview("a.jpg", SizeVariant::Small).unwrap();
        assert!(String::from_utf8(bytes).unwrap().ends_with("@123q80"));
    }

    #[test]
    fn spawn_warmup_respects_enabled_flag() {
        let (lib, _) = library_with(&["a.jpg"]);
        let cache = TempDir::new().unwrap();
        let mut config = config_for(lib.path(), cache.path());
        config.warmup.enabled = false;
        let library = Library::with_backend(config, MockBackend::new()).unwrap();

        assert!(library.spawn_warmup().unwrap().is_none());
        assert_eq!(library.generator().backend().render_count(), 0);
    }

    #[test]
    fn spawn_warmup_renders_configured_sizes() {
        let (lib, _) = library_with(&["a.jpg", "x/b.png"]);
        let cache = TempDir::new().unwrap();
        let mut config = config_for(lib.path(), cache.path());
        config.warmup.sizes = vec![SizeVariant::Small, SizeVariant::Big];
        let library = Library::with_backend(config, MockBackend::new()).unwrap();

        let report = library.spawn_warmup().unwrap().unwrap().join().unwrap();
        assert_eq!(report.images, 2);
        assert_eq!(library.generator().backend().render_count(), 4);

        // Previews are now served from cache
        library.preview("x/b.png", SizeVariant::Big).unwrap();
        assert_eq!(library.generator().backend().render_count(), 4);
        assert_eq!(library.cache_stats().hits, 1);
    }
}
