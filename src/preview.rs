//! Cache-first preview generation.
//!
//! [`PreviewGenerator::get_preview`] is the only way callers obtain preview
//! bytes. It resolves the path, derives the [`CacheKey`], and either serves
//! the cached buffer or renders a fresh one through the [`ImageBackend`] and
//! stores it.
//!
//! ## Size variants
//!
//! | Variant | Default box | JPEG quality |
//! |---|---|---|
//! | `small` | 400 px | 80 |
//! | `big` | 2560 px | 85 |
//!
//! The set of variants is closed; the numbers come from config.
//!
//! ## In-flight de-duplication
//!
//! A gallery page asks for dozens of previews at once, and a second viewer
//! opening the same folder asks for the same ones. Without coordination each
//! request would decode the same 40 MP source. The generator keeps a map of
//! in-flight renders keyed by [`CacheKey`]. The first caller for a key
//! installs a slot and renders; everyone else arriving for that key blocks on
//! the same slot and receives its result. The map lock is only held to find
//! or remove a slot, never during a render, so unrelated keys proceed in
//! parallel.

use crate::cache::{CacheKey, PreviewCache};
use crate::error::ErrorKind;
use crate::imaging::{ImageBackend, PreviewSpec, Quality, create_preview};
use crate::safe_path::{GuardError, PathGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// Content type of every generated preview.
pub const PREVIEW_CONTENT_TYPE: &str = "image/jpeg";

/// Suggested `Cache-Control` header for preview responses.
pub const PREVIEW_CACHE_CONTROL: &str = "public, max-age=3600";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error(transparent)]
    Path(#[from] GuardError),
    #[error("Not a file: {0}")]
    NotAFile(String),
    #[error("Unknown size variant: {0}")]
    UnknownVariant(String),
    #[error("Preview render failed: {0}")]
    Transform(String),
}

impl PreviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PreviewError::Path(e) => e.kind(),
            PreviewError::NotAFile(_) => ErrorKind::NotFound,
            PreviewError::UnknownVariant(_) => ErrorKind::InvalidArgument,
            PreviewError::Transform(_) => ErrorKind::TransformFailure,
        }
    }
}

/// Named preview preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeVariant {
    Small,
    Big,
}

impl SizeVariant {
    pub const ALL: [SizeVariant; 2] = [SizeVariant::Small, SizeVariant::Big];

    pub fn name(self) -> &'static str {
        match self {
            SizeVariant::Small => "small",
            SizeVariant::Big => "big",
        }
    }
}

impl fmt::Display for SizeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SizeVariant {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SizeVariant::ALL
            .into_iter()
            .find(|v| v.name() == s)
            .ok_or_else(|| PreviewError::UnknownVariant(s.to_string()))
    }
}

/// Bounding box and quality for each [`SizeVariant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSpecs {
    pub small: PreviewSpec,
    pub big: PreviewSpec,
}

impl VariantSpecs {
    pub fn spec(&self, variant: SizeVariant) -> &PreviewSpec {
        match variant {
            SizeVariant::Small => &self.small,
            SizeVariant::Big => &self.big,
        }
    }
}

impl Default for VariantSpecs {
    fn default() -> Self {
        Self {
            small: PreviewSpec {
                max_edge: 400,
                quality: Quality::new(80),
            },
            big: PreviewSpec {
                max_edge: 2560,
                quality: Quality::new(85),
            },
        }
    }
}

type Flight = Arc<OnceLock<Result<Arc<Vec<u8>>, PreviewError>>>;

/// Produces preview buffers, consulting the cache before the backend.
pub struct PreviewGenerator<B> {
    guard: PathGuard,
    cache: PreviewCache,
    backend: B,
    specs: VariantSpecs,
    in_flight: Mutex<HashMap<CacheKey, Flight>>,
}

impl<B: ImageBackend> PreviewGenerator<B> {
    pub fn new(guard: PathGuard, cache: PreviewCache, backend: B, specs: VariantSpecs) -> Self {
        Self {
            guard,
            cache,
            backend,
            specs,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Like [`get_preview`](Self::get_preview) with the variant given by name.
    pub fn get_preview_named(&self, relative: &str, variant: &str) -> Result<Vec<u8>, PreviewError> {
        self.get_preview(relative, variant.parse()?)
    }

    /// Preview bytes for `relative` at `variant`, from cache when possible.
    pub fn get_preview(&self, relative: &str, variant: SizeVariant) -> Result<Vec<u8>, PreviewError> {
        let source = self.guard.resolve(relative)?;
        if !source.is_file() {
            return Err(PreviewError::NotAFile(relative.to_string()));
        }

        let key = CacheKey::derive(&source, variant.name());
        if let Some(bytes) = self.cached(&key) {
            tracing::debug!(path = relative, %variant, "preview cache hit");
            return Ok(bytes);
        }

        let flight = self.join_flight(&key);
        let result = flight
            .get_or_init(|| {
                // Another flight may have finished between our miss and joining.
                if let Some(bytes) = self.cached(&key) {
                    return Ok(Arc::new(bytes));
                }
                tracing::debug!(path = relative, %variant, "rendering preview");
                let spec = self.specs.spec(variant);
                let bytes = create_preview(&self.backend, &source, spec)
                    .map_err(|e| PreviewError::Transform(e.to_string()))?;
                if let Err(e) = self.cache.put(&key, &bytes) {
                    tracing::warn!(path = relative, %variant, error = %e, "failed to store preview");
                }
                Ok(Arc::new(bytes))
            })
            .clone();
        self.leave_flight(&key, &flight);

        result.map(|bytes| bytes.as_ref().clone())
    }

    fn cached(&self, key: &CacheKey) -> Option<Vec<u8>> {
        match self.cache.get(key) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, "preview cache unreadable, regenerating");
                None
            }
        }
    }

    fn join_flight(&self, key: &CacheKey) -> Flight {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        in_flight.entry(key.clone()).or_default().clone()
    }

    fn leave_flight(&self, key: &CacheKey, flight: &Flight) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        if in_flight.get(key).is_some_and(|f| Arc::ptr_eq(f, flight)) {
            in_flight.remove(key);
        }
    }

    #[cfg(test)]
    fn in_flight_len(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}
