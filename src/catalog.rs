//! Java release catalog
//!
//! Maps release aliases ("6", "1.6", "6.0") and class file format codes to
//! the release they belong to. The table is data: a new release is added by
//! appending a record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Result, ScanError};

/// A single Java release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Ordinal release number (1 for 1.1, 6 for 1.6, ...)
    pub version: u32,
    /// Class file major version emitted for this release
    pub format_code: u16,
    /// Names this release can be referred to by
    pub aliases: Vec<String>,
}

impl VersionRecord {
    /// Create a record from its ordinal, format code, and aliases
    pub fn new(version: u32, format_code: u16, aliases: &[&str]) -> Self {
        Self {
            version,
            format_code,
            aliases: aliases.iter().map(|a| (*a).to_string()).collect(),
        }
    }
}

/// Built-in releases: format code is 44 + ordinal
fn builtin_records() -> Vec<VersionRecord> {
    vec![
        VersionRecord::new(1, 45, &["1", "1.1"]),
        VersionRecord::new(2, 46, &["2", "1.2"]),
        VersionRecord::new(3, 47, &["3", "1.3"]),
        VersionRecord::new(4, 48, &["4", "1.4"]),
        VersionRecord::new(5, 49, &["5", "1.5", "5.0"]),
        VersionRecord::new(6, 50, &["6", "1.6", "6.0"]),
        VersionRecord::new(7, 51, &["7", "1.7", "7.0"]),
    ]
}

/// Immutable lookup tables over a fixed list of releases
#[derive(Debug, Clone)]
pub struct VersionCatalog {
    records: Vec<VersionRecord>,
    by_alias: HashMap<String, usize>,
    by_code: HashMap<u16, usize>,
}

impl VersionCatalog {
    /// Build a catalog from a list of records
    ///
    /// Each record's ordinal is added to its aliases when not already listed.
    ///
    /// # Errors
    ///
    /// Returns error if two records share a format code or an alias
    pub fn new(mut records: Vec<VersionRecord>) -> Result<Self> {
        let mut by_alias = HashMap::new();
        let mut by_code = HashMap::with_capacity(records.len());

        for (idx, record) in records.iter_mut().enumerate() {
            if by_code.insert(record.format_code, idx).is_some() {
                return Err(ScanError::Config(format!(
                    "Duplicate class format code {} in release catalog",
                    record.format_code
                )));
            }

            let ordinal = record.version.to_string();
            if !record.aliases.contains(&ordinal) {
                record.aliases.push(ordinal);
            }

            for alias in &record.aliases {
                if by_alias.insert(alias.clone(), idx).is_some() {
                    return Err(ScanError::Config(format!(
                        "Release alias '{alias}' is used more than once"
                    )));
                }
            }
        }

        Ok(Self {
            records,
            by_alias,
            by_code,
        })
    }

    /// The catalog of releases known out of the box
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_records())
            .unwrap_or_else(|e| unreachable!("built-in release table is inconsistent: {e}"))
    }

    /// Extend this catalog with additional releases
    ///
    /// # Errors
    ///
    /// Returns error if an added record collides with an existing one
    pub fn with_records(self, extra: Vec<VersionRecord>) -> Result<Self> {
        if extra.is_empty() {
            return Ok(self);
        }
        let mut records = self.records;
        records.extend(extra);
        Self::new(records)
    }

    /// Look up a release by any of its aliases
    #[must_use]
    pub fn lookup_by_alias(&self, alias: &str) -> Option<&VersionRecord> {
        self.by_alias.get(alias).map(|&idx| &self.records[idx])
    }

    /// Look up a release by class file format code
    #[must_use]
    pub fn lookup_by_format_code(&self, code: u16) -> Option<&VersionRecord> {
        self.by_code.get(&code).map(|&idx| &self.records[idx])
    }

    /// All releases in table order
    #[must_use]
    pub fn records(&self) -> &[VersionRecord] {
        &self.records
    }
}

impl Default for VersionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
