//! Scan results and where they go
//!
//! The scanner never prints. Findings and per-item failures are handed to a
//! [`ScanSink`]; the console sink writes findings to the report stream and
//! failures to the diagnostic log, so the two never mix.

use std::fmt;
use std::io::{self, Write};

use tracing::warn;

use crate::catalog::VersionRecord;
use crate::config::ScanConfig;
use crate::path::ScanPath;
use crate::ScanError;

/// A classified class file that passed the version filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Where the class file was found
    pub path: ScanPath,
    /// Format code read from its header
    pub format_code: u16,
    /// Release ordinal, if the code is in the catalog
    pub version: Option<u32>,
}

impl Finding {
    /// Build a finding if the code passes `config`'s bounds
    #[must_use]
    pub fn filter(
        path: ScanPath,
        format_code: u16,
        resolved: Option<&VersionRecord>,
        config: &ScanConfig,
    ) -> Option<Self> {
        config.admits(format_code).then(|| Self {
            path,
            format_code,
            version: resolved.map(|r| r.version),
        })
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Found matching class file: {} compiled for Java version: ",
            self.path
        )?;
        match self.version {
            Some(version) => write!(f, "{version}"),
            None => write!(f, "unknown format version {}", self.format_code),
        }
    }
}

/// Receiver of scan output
pub trait ScanSink {
    /// Record a finding
    ///
    /// # Errors
    ///
    /// Returns error if the finding cannot be delivered; this ends the scan
    fn finding(&mut self, finding: &Finding) -> io::Result<()>;

    /// Record a failure that caused `path` to be skipped
    fn failure(&mut self, path: &ScanPath, error: &ScanError);
}

impl<S: ScanSink + ?Sized> ScanSink for &mut S {
    fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        (**self).finding(finding)
    }

    fn failure(&mut self, path: &ScanPath, error: &ScanError) {
        (**self).failure(path, error);
    }
}

/// Writes one line per finding to `out`; failures go to the log
pub struct ConsoleSink<W> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    /// Create a sink writing report lines to `out`
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Recover the report writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ScanSink for ConsoleSink<W> {
    fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        writeln!(self.out, "{finding}")?;
        self.out.flush()
    }

    fn failure(&mut self, path: &ScanPath, error: &ScanError) {
        warn!("Error trying to process {path}: {error}");
    }
}

/// Keeps everything in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    /// Findings in report order
    pub findings: Vec<Finding>,
    /// Failures as `(path, message)` in the order they occurred
    pub failures: Vec<(ScanPath, String)>,
}

impl CollectingSink {
    /// Report lines, as the console sink would print them
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.findings.iter().map(ToString::to_string).collect()
    }
}

impl ScanSink for CollectingSink {
    fn finding(&mut self, finding: &Finding) -> io::Result<()> {
        self.findings.push(finding.clone());
        Ok(())
    }

    fn failure(&mut self, path: &ScanPath, error: &ScanError) {
        self.failures.push((path.clone(), error.to_string()));
    }
}
