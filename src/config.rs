//! Repository configuration.
//!
//! Loaded from an optional `pikshr.toml`. Every key has a default, so a file
//! only needs the values it wants to change. Unknown keys are rejected to
//! catch typos early.
//!
//! ## Configuration Options
//!
//! ```toml
//! [store]
//! keyspace = "pikshr"              # Keyspace holding the picture rows
//! column_family = "picture"        # Column family of picture rows
//! snapshot = "pikshr-store.json"   # Where the local store is persisted
//!
//! [thumbnails]
//! max_width = 200                  # Thumbnails fit inside this box
//! max_height = 200
//!
//! [consistency]
//! read = "one"                     # "one" or "quorum"
//! write = "quorum"
//!
//! [listing]
//! pics_per_page = 32               # Default length of `recent`
//! own_pics_per_page = 8            # ... when filtered to one owner
//!
//! [processing]
//! max_processes = 4                # Bulk import workers (omit for auto)
//! ```

use crate::store::Consistency;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PikshrConfig {
    /// Where picture rows live.
    pub store: StoreConfig,
    /// Thumbnail bounding box.
    pub thumbnails: ThumbnailsConfig,
    /// Consistency levels for reads and writes.
    pub consistency: ConsistencyConfig,
    /// Listing lengths.
    pub listing: ListingConfig,
    /// Bulk import parallelism.
    pub processing: ProcessingConfig,
}

impl PikshrConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.keyspace.is_empty() {
            return Err(ConfigError::Validation(
                "store.keyspace must not be empty".into(),
            ));
        }
        if self.store.column_family.is_empty() {
            return Err(ConfigError::Validation(
                "store.column_family must not be empty".into(),
            ));
        }
        if self.thumbnails.max_width == 0 || self.thumbnails.max_height == 0 {
            return Err(ConfigError::Validation(
                "thumbnails.max_width and max_height must be non-zero".into(),
            ));
        }
        if self.listing.pics_per_page == 0 || self.listing.own_pics_per_page == 0 {
            return Err(ConfigError::Validation(
                "listing page sizes must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub keyspace: String,
    pub column_family: String,
    /// Snapshot file of the local store.
    pub snapshot: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            keyspace: "pikshr".to_string(),
            column_family: "picture".to_string(),
            snapshot: PathBuf::from("pikshr-store.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThumbnailsConfig {
    pub max_width: u32,
    pub max_height: u32,
}

impl Default for ThumbnailsConfig {
    fn default() -> Self {
        Self {
            max_width: 200,
            max_height: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConsistencyConfig {
    /// Single replica is enough to display a picture.
    pub read: Consistency,
    /// Uploads must survive the loss of one replica.
    pub write: Consistency,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            read: Consistency::One,
            write: Consistency::Quorum,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    pub pics_per_page: usize,
    pub own_pics_per_page: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            pics_per_page: 32,
            own_pics_per_page: 8,
        }
    }
}

/// Parallel import settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel import workers.
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
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Load and validate a config file.
///
/// A missing file yields the stock defaults; a file that exists but does not
/// parse or validate is an error.
pub fn load_config(path: &Path) -> Result<PikshrConfig, ConfigError> {
    let config = match fs::read_to_string(path) {
        Ok(content) => toml::from_str(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PikshrConfig::default(),
        Err(e) => return Err(e.into()),
    };
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `pikshr.toml` with every key.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# pikshr configuration
# ====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Store
# ---------------------------------------------------------------------------
[store]
# Keyspace holding the picture rows.
keyspace = "pikshr"

# Column family of picture rows. Row keys are raw SHA-256 digests.
column_family = "picture"

# File the local store is saved to between runs.
snapshot = "pikshr-store.json"

# ---------------------------------------------------------------------------
# Thumbnails
# ---------------------------------------------------------------------------
[thumbnails]
# Thumbnails are scaled down (never up) to fit inside this box, keeping the
# aspect ratio of the original.
max_width = 200
max_height = 200

# ---------------------------------------------------------------------------
# Consistency
# ---------------------------------------------------------------------------
[consistency]
# "one" waits for a single replica, "quorum" for a majority.
read = "one"
write = "quorum"

# ---------------------------------------------------------------------------
# Listing
# ---------------------------------------------------------------------------
[listing]
# Number of pictures `recent` shows.
pics_per_page = 32

# Number of pictures `recent --owner` shows.
own_pics_per_page = 8

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for `import`. Omit to use all CPU cores.
# max_processes = 4
"##
}
