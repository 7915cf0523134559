//! Configuration types for cvscan

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::catalog::{VersionCatalog, VersionRecord};
use crate::{Result, ScanError};

/// Default ceiling on archive-in-archive nesting
pub const DEFAULT_MAX_ARCHIVE_DEPTH: usize = 32;

/// Settings for a single scan; read-only while the scan runs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Only report class files at or above this release
    pub min_version: Option<VersionRecord>,
    /// Only report class files at or below this release
    pub max_version: Option<VersionRecord>,
    /// Emit progress information
    pub verbose: bool,
    /// Deepest archive nesting that is opened (top-level archives are depth 1)
    pub max_archive_depth: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_version: None,
            max_version: None,
            verbose: false,
            max_archive_depth: DEFAULT_MAX_ARCHIVE_DEPTH,
        }
    }
}

impl ScanConfig {
    /// Set the lower bound from a release alias
    ///
    /// Unknown aliases leave the bound unset.
    #[must_use]
    pub fn with_newer(mut self, catalog: &VersionCatalog, alias: Option<&str>) -> Self {
        self.min_version = alias.and_then(|a| catalog.lookup_by_alias(a)).cloned();
        self
    }

    /// Set the upper bound from a release alias
    ///
    /// Unknown aliases leave the bound unset.
    #[must_use]
    pub fn with_older(mut self, catalog: &VersionCatalog, alias: Option<&str>) -> Self {
        self.max_version = alias.and_then(|a| catalog.lookup_by_alias(a)).cloned();
        self
    }

    /// Whether a format code passes the configured bounds
    #[must_use]
    pub fn admits(&self, format_code: u16) -> bool {
        if let Some(min) = &self.min_version {
            if format_code < min.format_code {
                return false;
            }
        }
        if let Some(max) = &self.max_version {
            if format_code > max.format_code {
                return false;
            }
        }
        true
    }
}

/// Contents of an optional configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Scan defaults
    #[serde(default)]
    pub scan: ScanSettings,
    /// Releases appended to the built-in catalog
    #[serde(default)]
    pub releases: Vec<VersionRecord>,
}

/// `[scan]` table of the configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSettings {
    /// Root directory to scan
    pub dir: Option<PathBuf>,
    /// Lower bound alias
    pub newer: Option<String>,
    /// Upper bound alias
    pub older: Option<String>,
    /// Ceiling on archive nesting
    #[serde(default = "default_max_archive_depth")]
    pub max_archive_depth: usize,
    /// Emit progress information
    #[serde(default)]
    pub verbose: bool,
}

fn default_max_archive_depth() -> usize {
    DEFAULT_MAX_ARCHIVE_DEPTH
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            dir: None,
            newer: None,
            older: None,
            max_archive_depth: DEFAULT_MAX_ARCHIVE_DEPTH,
            verbose: false,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, parsed, or is invalid
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScanError::Config(format!("Failed to read config file: {e}")))?;

        let settings: Self = toml::from_str(&content)
            .map_err(|e| ScanError::Config(format!("Failed to parse config: {e}")))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    ///
    /// # Errors
    ///
    /// Returns error if settings are invalid
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_archive_depth == 0 {
            return Err(ScanError::Config(
                "max_archive_depth must be at least 1".to_string(),
            ));
        }

        for (i, release) in self.releases.iter().enumerate() {
            if release.aliases.iter().any(String::is_empty) {
                return Err(ScanError::Config(format!(
                    "Release {i}: aliases cannot be empty"
                )));
            }
        }

        Ok(())
    }

    /// Built-in catalog extended with the configured releases
    ///
    /// # Errors
    ///
    /// Returns error if a configured release collides with a known one
    pub fn catalog(&self) -> Result<VersionCatalog> {
        VersionCatalog::builtin().with_records(self.releases.clone())
    }
}
