//! cvscan - find Java class files by class file version
//!
//! Recursively scans a directory tree for `.class` files and zip-family
//! archives (jar, war, ear, sar, rar), descending into archives nested inside
//! archives without extracting anything to disk.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::missing_panics_doc,
    clippy::multiple_crate_versions
)]

pub mod archive;
pub mod catalog;
pub mod config;
pub mod error;
pub mod header;
pub mod path;
pub mod report;
pub mod scanner;

#[cfg(test)]
mod fixture;

pub use catalog::{VersionCatalog, VersionRecord};
pub use config::{ScanConfig, Settings};
pub use error::{Result, ScanError};
pub use report::{CollectingSink, ConsoleSink, Finding, ScanSink};
pub use scanner::{ScanStats, Scanner};
