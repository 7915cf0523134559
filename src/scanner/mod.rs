//! Scan engine
//!
//! Walks a directory tree depth-first. Within each directory, archives are
//! processed first, then class files, then subdirectories, each group in
//! enumeration order. Archives are read as forward-only streams and nested
//! archives are opened directly on their parent's entry stream.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::archive::ZipStream;
use crate::catalog::VersionCatalog;
use crate::config::ScanConfig;
use crate::header::extract_format_code;
use crate::path::ScanPath;
use crate::report::{Finding, ScanSink};
use crate::{Result, ScanError};

/// Progress output: `info` when verbose, `debug` otherwise
macro_rules! progress {
    ($scanner:expr, $($arg:tt)+) => {
        if $scanner.config.verbose {
            tracing::info!($($arg)+);
        } else {
            tracing::debug!($($arg)+);
        }
    };
}

mod archive;
mod directory;

/// Counters for a finished scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Directories listed
    pub directories: u64,
    /// Archives opened, nested ones included
    pub archives: u64,
    /// Archive entries read
    pub archive_entries: u64,
    /// Class files whose header was read
    pub class_files: u64,
    /// Findings delivered to the sink
    pub findings: u64,
    /// Class files outside the version bounds
    pub filtered: u64,
    /// Items skipped because of an error
    pub failures: u64,
}

/// Sequential scanner over directories and archives
pub struct Scanner<'a, S> {
    config: &'a ScanConfig,
    catalog: &'a VersionCatalog,
    sink: S,
    stats: ScanStats,
}

impl<'a, S: ScanSink> Scanner<'a, S> {
    /// Create a scanner delivering results to `sink`
    pub fn new(config: &'a ScanConfig, catalog: &'a VersionCatalog, sink: S) -> Self {
        Self {
            config,
            catalog,
            sink,
            stats: ScanStats::default(),
        }
    }

    /// Scan the tree rooted at `root`
    ///
    /// A root that is not a directory is a no-op. Per-item failures go to the
    /// sink and do not stop the scan.
    ///
    /// # Errors
    ///
    /// Returns error only if the sink rejects a finding
    pub fn scan(&mut self, root: &Path) -> Result<ScanStats> {
        self.walk_directories(root)?;

        let stats = self.stats;
        info!(
            "Scan complete: {} directories, {} archives ({} entries), {} class files, {} reported, {} filtered, {} failures",
            stats.directories,
            stats.archives,
            stats.archive_entries,
            stats.class_files,
            stats.findings,
            stats.filtered,
            stats.failures
        );
        Ok(stats)
    }

    /// Classify a single class file on disk
    ///
    /// # Errors
    ///
    /// Returns error only if the sink rejects a finding
    pub fn scan_class_file(&mut self, path: &Path) -> Result<()> {
        progress!(self, "Processing class file: {}", path.display());
        let scan_path = ScanPath::from_path(path);

        let code = File::open(path)
            .map_err(ScanError::from)
            .and_then(|mut file| extract_format_code(&mut file));

        match code {
            Ok(code) => self.classify(scan_path, code),
            Err(e) => self.fail(&scan_path, e),
        }
    }

    /// Scan a single archive on disk, including nested archives
    ///
    /// # Errors
    ///
    /// Returns error only if the sink rejects a finding
    pub fn scan_archive_file(&mut self, path: &Path) -> Result<()> {
        progress!(self, "Processing archive file: {}", path.display());
        let scan_path = ScanPath::from_path(path);

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => return self.fail(&scan_path, e.into()),
        };
        self.stats.archives += 1;

        let mut reader = BufReader::new(file);
        let mut stream = ZipStream::new(&mut reader as &mut dyn BufRead);
        match self.walk_archive(&mut stream, &scan_path, 1) {
            Ok(()) => Ok(()),
            Err(e) => self.fail(&scan_path, e),
        }
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> ScanStats {
        self.stats
    }

    /// Recover the sink
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Resolve a format code and report it unless filtered
    fn classify(&mut self, path: ScanPath, format_code: u16) -> Result<()> {
        self.stats.class_files += 1;
        let resolved = self.catalog.lookup_by_format_code(format_code);

        match Finding::filter(path, format_code, resolved, self.config) {
            Some(finding) => {
                self.stats.findings += 1;
                self.sink.finding(&finding).map_err(ScanError::Report)
            }
            None => {
                self.stats.filtered += 1;
                Ok(())
            }
        }
    }

    /// Hand a recoverable error to the sink; fatal errors are returned
    fn fail(&mut self, path: &ScanPath, error: ScanError) -> Result<()> {
        if error.is_fatal() {
            return Err(error);
        }
        self.stats.failures += 1;
        self.sink.failure(path, &error);
        Ok(())
    }
}
