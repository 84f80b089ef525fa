//! Startup crawl that pre-renders previews for the whole library.
//!
//! The first visit to a large folder would otherwise pay for every preview
//! render at once. The crawler walks the tree depth-first (a folder's
//! contents before its next sibling), hands each image to a fixed-size rayon
//! pool, and asks the [`PreviewGenerator`] for every configured variant in
//! turn. Already-cached previews cost one file read, so re-running the crawl
//! after a restart is cheap.
//!
//! The walk is iterative (`walkdir` keeps an explicit stack) and does not
//! follow symlinks, so deep or cyclic trees cannot exhaust the process.
//! Failures on individual images are logged and counted; they never stop the
//! crawl.

use crate::imaging::ImageBackend;
use crate::listing::is_image_name;
use crate::preview::{PreviewGenerator, SizeVariant};
use rayon::prelude::*;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

/// Outcome of one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WarmupReport {
    /// Image files visited.
    pub images: usize,
    /// (image, variant) pairs that failed to render.
    pub failures: usize,
    /// Directories that could not be read.
    pub unreadable: usize,
    pub elapsed: Duration,
}

impl fmt::Display for WarmupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} images warmed in {:.1}s",
            self.images,
            self.elapsed.as_secs_f64()
        )?;
        if self.failures > 0 {
            write!(f, ", {} failed", self.failures)?;
        }
        if self.unreadable > 0 {
            write!(f, ", {} unreadable", self.unreadable)?;
        }
        Ok(())
    }
}

/// Crawl the generator's root and render every image at each of `variants`.
///
/// Runs on a dedicated pool of `threads` workers and blocks until done.
pub fn warmup<B: ImageBackend>(
    generator: &PreviewGenerator<B>,
    variants: &[SizeVariant],
    threads: usize,
) -> WarmupReport {
    let started = Instant::now();
    let guard = generator.guard();
    let root = guard.root();
    tracing::info!(root = %root.display(), ?variants, threads, "preview warmup started");

    let pool = match rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .thread_name(|i| format!("warmup-{i}"))
        .build()
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "cannot start warmup pool");
            return WarmupReport::default();
        }
    };

    let images = AtomicUsize::new(0);
    let failures = AtomicUsize::new(0);
    let unreadable = AtomicUsize::new(0);

    pool.install(|| {
        WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) if e.depth() == 0 => {
                    tracing::error!(error = %e, "library root unreadable, warmup aborted");
                    unreadable.fetch_add(1, Ordering::Relaxed);
                    None
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable path");
                    unreadable.fetch_add(1, Ordering::Relaxed);
                    None
                }
            })
            .inspect(|entry| {
                if entry.file_type().is_dir() {
                    tracing::debug!(folder = %entry.path().display(), "scanning folder");
                }
            })
            .filter(|entry| {
                entry.file_type().is_file() && is_image_name(&entry.file_name().to_string_lossy())
            })
            .filter_map(|entry| guard.relative_of(entry.path()))
            .par_bridge()
            .for_each(|relative| {
                for &variant in variants {
                    if let Err(e) = generator.get_preview(&relative, variant) {
                        tracing::warn!(path = %relative, %variant, error = %e, "failed to warm preview");
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
                images.fetch_add(1, Ordering::Relaxed);
            });
    });

    let report = WarmupReport {
        images: images.into_inner(),
        failures: failures.into_inner(),
        unreadable: unreadable.into_inner(),
        elapsed: started.elapsed(),
    };
    tracing::info!(
        images = report.images,
        failures = report.failures,
        cache = %generator.cache().stats(),
        "preview warmup finished"
    );
    report
}

/// Run [`warmup`] on a named background thread.
///
/// Request handling does not wait for it; join the handle to collect the
/// report (the CLI does, a server usually does not).
pub fn spawn<B: ImageBackend + 'static>(
    generator: Arc<PreviewGenerator<B>>,
    variants: Vec<SizeVariant>,
    threads: usize,
) -> std::io::Result<JoinHandle<WarmupReport>> {
    std::thread::Builder::new()
        .name("preview-warmup".into())
        .spawn(move || warmup(&generator, &variants, threads))
}
