//! Scan locations and file name classification

use std::fmt;
use std::path::Path;

/// Suffix of compiled class files
pub const CLASS_SUFFIX: &str = ".class";

/// Suffixes of zip-family containers that are descended into
pub const ARCHIVE_SUFFIXES: [&str; 5] = [".jar", ".ear", ".war", ".sar", ".rar"];

/// What a file or archive entry is, judged by its name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Compiled class file
    Class,
    /// Nested container
    Archive,
    /// Anything else
    Other,
}

impl FileKind {
    /// Classify a name by its suffix, ignoring ASCII case
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(CLASS_SUFFIX) {
            Self::Class
        } else if ARCHIVE_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
            Self::Archive
        } else {
            Self::Other
        }
    }

    /// Classify a filesystem path by its file name
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.file_name()
            .map_or(Self::Other, |name| Self::from_name(&name.to_string_lossy()))
    }
}

/// Location of a scanned item: a filesystem path, optionally followed by
/// `/entry` segments for each archive it is nested in
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScanPath(String);

impl ScanPath {
    /// Location of a file on disk
    pub fn from_path(path: &Path) -> Self {
        Self(path.display().to_string())
    }

    /// Location of an entry inside the archive at `self`
    #[must_use]
    pub fn join_entry(&self, entry_name: &str) -> Self {
        Self(format!("{}/{entry_name}", self.0))
    }

    /// The location as a string
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScanPath {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
