//! Configuration file support
//!
//! Optional TOML file with search defaults. CLI flags take precedence.
//!
//! ```toml
//! [search]
//! sentinel_km = 100000.0
//! parallel = true
//! threads = 8
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::border::{BorderError, Result, SearchOptions};

/// Application directory name under the platform config dir
pub const APP_NAME: &str = "cluster-border";

/// Config file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// `[search]` table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub sentinel_km: Option<f64>,
    pub parallel: Option<bool>,
    pub threads: Option<usize>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub search: SearchConfig,
}

impl Config {
    /// Default config path (`<config_dir>/cluster-border/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse configuration from TOML text; `origin` is used in errors
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self> {
        toml::from_str(text).map_err(|source| BorderError::Config {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(BorderError::InputNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text, path)
    }

    /// Load an explicit file, else the default file if present, else defaults
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Search options described by this config
    pub fn search_options(&self) -> SearchOptions {
        let mut builder = SearchOptions::builder();
        if let Some(km) = self.search.sentinel_km {
            builder = builder.sentinel_km(km);
        }
        if let Some(parallel) = self.search.parallel {
            builder = builder.parallel(parallel);
        }
        if let Some(threads) = self.search.threads {
            builder = builder.threads(threads);
        }
        builder.build()
    }
}
