//! cvscan CLI

use std::io;
use std::path::PathBuf;
use std::process;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cvscan::{ConsoleSink, ScanConfig, ScanError, Scanner, Settings, VersionCatalog};

/// Scan a directory tree, including nested Java archives, for class files
/// and report the Java release each was compiled for.
#[derive(Parser, Debug)]
#[command(name = "cvscan", author, version, about, long_about = None)]
struct Cli {
    /// Root directory to search for class files and Java archives
    /// (defaults to the current working directory)
    #[arg(short, long, value_name = "PATH")]
    dir: Option<PathBuf>,

    /// Only report class files compiled for this Java release or newer
    #[arg(short, long, value_name = "VERSION")]
    newer: Option<String>,

    /// Only report class files compiled for this Java release or older
    #[arg(short, long, value_name = "VERSION")]
    older: Option<String>,

    /// Display more processing info
    #[arg(short, long)]
    verbose: bool,

    /// Read defaults and extra releases from a TOML file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Deepest archive-in-archive nesting to open
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    max_depth: Option<u32>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let default = if verbose { "info" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {e}"))
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => Settings::default(),
    };

    let verbose = cli.verbose || settings.scan.verbose;
    init_tracing(verbose)?;

    let catalog = settings.catalog().context("building release catalog")?;

    let root = match cli.dir.or_else(|| settings.scan.dir.clone()) {
        Some(dir) => dir,
        None => std::env::current_dir()
            .map_err(|e| ScanError::Config(format!("Cannot resolve working directory: {e}")))?,
    };
    if !root.exists() {
        return Err(ScanError::Config(format!(
            "Root directory does not exist: {}",
            root.display()
        ))
        .into());
    }

    let newer = cli.newer.or_else(|| settings.scan.newer.clone());
    let older = cli.older.or_else(|| settings.scan.older.clone());
    warn_unknown_alias(&catalog, "newer", newer.as_deref());
    warn_unknown_alias(&catalog, "older", older.as_deref());

    let config = ScanConfig {
        verbose,
        max_archive_depth: cli
            .max_depth
            .map_or(settings.scan.max_archive_depth, |d| d as usize),
        ..ScanConfig::default()
    }
    .with_newer(&catalog, newer.as_deref())
    .with_older(&catalog, older.as_deref());

    info!("Scanning {} (max archive depth {})", root.display(), config.max_archive_depth);

    let stdout = io::stdout();
    let mut scanner = Scanner::new(&config, &catalog, ConsoleSink::new(stdout.lock()));
    scanner.scan(&root)?;

    Ok(())
}

fn warn_unknown_alias(catalog: &VersionCatalog, flag: &str, alias: Option<&str>) {
    if let Some(alias) = alias {
        if catalog.lookup_by_alias(alias).is_none() {
            warn!("Unknown Java release '{alias}' for --{flag}; the bound is ignored");
        }
    }
}
