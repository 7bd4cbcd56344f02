//! Engine configuration module.
//!
//! Handles loading, validating, and merging `media-styles.toml`. Stock
//! defaults are overridden by the user file; anything the file leaves out
//! keeps its default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [styles]                      # Style name -> target size
//! thumb = { width = 100, height = 100 }
//! medium = { width = 300, height = 300 }
//!
//! [encoding]
//! quality = 90                  # JPEG quality (1-100)
//! interpolation = "triangle"    # nearest, triangle, catmull-rom, gaussian, lanczos3
//!
//! [storage]
//! root = "public"               # Directory variants are written under
//! url_prefix = "/system"        # Prefix of every public URL
//!
//! [processing]
//! max_processes = 4             # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want. The one
//! exception is `[styles]`, which replaces the stock table as a whole so that
//! a project never inherits styles it did not ask for.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Interpolation, Quality, RustCodec};
use crate::registry::{StyleRegistry, is_valid_style_name};
use crate::storage::FileSystemStorage;
use crate::types::Size;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "media-styles.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Engine configuration loaded from `media-styles.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Style name → target size.
    pub styles: BTreeMap<String, StyleSize>,
    /// Encoder settings shared by every style.
    pub encoding: EncodingConfig,
    /// Local-disk storage backend settings.
    pub storage: StorageConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            styles: BTreeMap::from([
                ("medium".to_string(), StyleSize::new(300, 300)),
                ("thumb".to_string(), StyleSize::new(100, 100)),
            ]),
            encoding: EncodingConfig::default(),
            storage: StorageConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.styles.is_empty() {
            return Err(ConfigError::Validation(
                "styles must define at least one style".into(),
            ));
        }
        for (name, size) in &self.styles {
            if !is_valid_style_name(name) {
                return Err(ConfigError::Validation(format!(
                    "styles.{name}: names may only contain letters, digits, '_' and '-'"
                )));
            }
            if size.width == 0 || size.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "styles.{name}: width and height must be non-zero"
                )));
            }
        }
        if !(1..=100).contains(&self.encoding.quality) {
            return Err(ConfigError::Validation(
                "encoding.quality must be 1-100".into(),
            ));
        }
        if self.storage.root.trim().is_empty() {
            return Err(ConfigError::Validation(
                "storage.root must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Build the style registry described by `[styles]`.
    pub fn registry(&self) -> Result<StyleRegistry, ConfigError> {
        StyleRegistry::new(
            self.styles
                .iter()
                .map(|(name, size)| (name.clone(), Size::from(*size))),
        )
        .map_err(|e| ConfigError::Validation(e.to_string()))
    }

    pub fn codec(&self) -> RustCodec {
        RustCodec::with_quality(Quality::new(self.encoding.quality))
    }

    /// Storage backend rooted at `storage.root`, relative to `base`.
    pub fn file_storage(&self, base: &Path) -> FileSystemStorage {
        FileSystemStorage::new(base.join(&self.storage.root), self.storage.url_prefix.clone())
    }
}

/// Target size of one style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleSize {
    pub width: u32,
    pub height: u32,
}

impl StyleSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<StyleSize> for Size {
    fn from(s: StyleSize) -> Self {
        Size::new(s.width, s.height)
    }
}

/// Encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// JPEG quality (1 = worst, 100 = best). Lossless formats ignore it.
    pub quality: u32,
    /// Resampling filter used for every frame of every style.
    pub interpolation: Interpolation,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            quality: 90,
            interpolation: Interpolation::default(),
        }
    }
}

/// Local-disk storage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Directory files are written under.
    pub root: String,
    /// Prefix joined with a storage path to form its public URL.
    pub url_prefix: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: "public".to_string(),
            url_prefix: "/system".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
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
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(EngineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
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

/// Merge an optional user overlay onto the stock defaults, then deserialize
/// and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<EngineConfig, ConfigError> {
    let merged = match overlay {
        Some(overlay) => {
            let mut base = base;
            // A user [styles] table is the complete style list
            if let (Some(_), toml::Value::Table(table)) = (overlay.get("styles"), &mut base) {
                table.remove("styles");
            }
            merge_toml(base, overlay)
        }
        None => base,
    };
    let config: EngineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `path`, falling back to stock defaults when it is absent.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    resolve_config(stock_defaults_value()?, load_raw_config(path)?)
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# media-styles configuration
# ==========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Styles
# ---------------------------------------------------------------------------
# Every upload is derived into one variant per style, center-cropped to the
# style's aspect ratio and scaled to exactly width x height.
# Names may only contain letters, digits, '_' and '-'.
# A [styles] table here replaces the defaults entirely.
[styles]
medium = { width = 300, height = 300 }
thumb = { width = 100, height = 100 }

# ---------------------------------------------------------------------------
# Encoding
# ---------------------------------------------------------------------------
[encoding]
# JPEG quality (1 = worst, 100 = best). PNG, GIF, WebP, BMP and TIFF are lossless.
quality = 90

# Resampling filter: nearest, triangle, catmull-rom, gaussian, lanczos3.
interpolation = "triangle"

# ---------------------------------------------------------------------------
# Storage
# ---------------------------------------------------------------------------
[storage]
# Directory files are written under, relative to the working directory.
root = "public"

# Public URLs are <url_prefix>/<storage path>.
url_prefix = "/system"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
