//! Library configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; the user's file is merged over them key by key, so a
//! config only has to name the values it changes. CLI flags (`--root`,
//! `--cache-dir`) are applied on top by the binary.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! root = "."                    # Library root; nothing outside it is served
//! cache_dir = ".rawshelf-cache" # Where rendered previews are stored
//!
//! [previews.small]
//! max_edge = 400                # Bounding box, pixels
//! quality = 80                  # JPEG quality (1-100)
//!
//! [previews.big]
//! max_edge = 2560
//! quality = 85
//!
//! [warmup]
//! enabled = true                # Pre-render previews at startup
//! sizes = ["small"]             # Variants to pre-render
//!
//! [processing]
//! max_processes = 4             # Max warmup workers (omit for auto = CPU cores)
//!
//! [archive]
//! compression_level = 9         # Deflate level (0-9)
//! temp_dir = "/tmp"             # Where exports are built (omit for system temp)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::archive::{ArchiveOptions, DEFAULT_COMPRESSION_LEVEL};
use crate::imaging::{PreviewSpec, Quality};
use crate::preview::{SizeVariant, VariantSpecs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default name of the config file, looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Library configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShelfConfig {
    /// Library root directory.
    pub root: PathBuf,
    /// Preview cache directory.
    pub cache_dir: PathBuf,
    pub previews: PreviewsConfig,
    pub warmup: WarmupConfig,
    pub processing: ProcessingConfig,
    pub archive: ArchiveConfig,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            cache_dir: PathBuf::from(".rawshelf-cache"),
            previews: PreviewsConfig::default(),
            warmup: WarmupConfig::default(),
            processing: ProcessingConfig::default(),
            archive: ArchiveConfig::default(),
        }
    }
}

impl ShelfConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, size) in [("small", &self.previews.small), ("big", &self.previews.big)] {
            if size.max_edge == 0 {
                return Err(ConfigError::Validation(format!(
                    "previews.{name}.max_edge must be non-zero"
                )));
            }
            if !(1..=100).contains(&size.quality) {
                return Err(ConfigError::Validation(format!(
                    "previews.{name}.quality must be 1-100"
                )));
            }
        }
        if !(0..=9).contains(&self.archive.compression_level) {
            return Err(ConfigError::Validation(
                "archive.compression_level must be 0-9".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Per-variant render settings for the preview generator.
    pub fn variant_specs(&self) -> VariantSpecs {
        VariantSpecs {
            small: self.previews.small.spec(),
            big: self.previews.big.spec(),
        }
    }

    pub fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            compression_level: self.archive.compression_level,
            temp_dir: self
                .archive
                .temp_dir
                .clone()
                .unwrap_or_else(std::env::temp_dir),
        }
    }
}

/// Bounding box and quality of every preview variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PreviewsConfig {
    pub small: PreviewSizeConfig,
    pub big: PreviewSizeConfig,
}

impl Default for PreviewsConfig {
    fn default() -> Self {
        Self {
            small: PreviewSizeConfig {
                max_edge: 400,
                quality: 80,
            },
            big: PreviewSizeConfig {
                max_edge: 2560,
                quality: 85,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreviewSizeConfig {
    /// Longest edge of the preview, in pixels. Smaller sources are not enlarged.
    pub max_edge: u32,
    /// JPEG quality (1-100).
    pub quality: u32,
}

impl PreviewSizeConfig {
    fn spec(&self) -> PreviewSpec {
        PreviewSpec {
            max_edge: self.max_edge,
            quality: Quality::new(self.quality),
        }
    }
}

/// Startup warmup crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WarmupConfig {
    pub enabled: bool,
    pub sizes: Vec<SizeVariant>,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sizes: vec![SizeVariant::Small],
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel warmup workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Zip export settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub compression_level: i64,
    /// Directory for in-progress archives; system temp dir when absent.
    pub temp_dir: Option<PathBuf>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            temp_dir: None,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ShelfConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ShelfConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ShelfConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, or stock defaults if it is missing.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<ShelfConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# rawshelf Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Library root. Every listing, preview, download and export is confined to
# this directory; paths that climb out of it (including via symlinks) are
# refused.
root = "."

# Where rendered previews are stored. Entries are never invalidated; delete
# the directory to force re-rendering.
cache_dir = ".rawshelf-cache"

# ---------------------------------------------------------------------------
# Preview sizes
# ---------------------------------------------------------------------------
# Previews fit inside a max_edge x max_edge box, keep their aspect ratio,
# are rotated upright per EXIF, never enlarged, and encoded as JPEG.
[previews.small]
max_edge = 400
quality = 80

[previews.big]
max_edge = 2560
quality = 85

# ---------------------------------------------------------------------------
# Startup warmup
# ---------------------------------------------------------------------------
[warmup]
# Walk the whole library at startup and render missing previews.
enabled = true

# Variants to pre-render: "small", "big".
sizes = ["small"]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel warmup workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Zip export
# ---------------------------------------------------------------------------
[archive]
# Deflate level, 0 (store) to 9 (smallest).
compression_level = 9

# Directory where archives are assembled before download.
# Omit to use the system temp directory.
# temp_dir = "/tmp"
"##
}
