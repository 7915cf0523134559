//! Directory traversal

use std::fs;
use std::path::{Path, PathBuf};

use crate::path::{FileKind, ScanPath};
use crate::report::ScanSink;
use crate::Result;

use super::Scanner;

/// Immediate children of a directory, partitioned by kind
#[derive(Debug, Default)]
struct Listing {
    archives: Vec<PathBuf>,
    class_files: Vec<PathBuf>,
    subdirs: Vec<PathBuf>,
}

impl<S: ScanSink> Scanner<'_, S> {
    /// Depth-first walk from `root` using an explicit stack
    pub(super) fn walk_directories(&mut self, root: &Path) -> Result<()> {
        if !root.is_dir() {
            progress!(self, "Not a directory, nothing to scan: {}", root.display());
            return Ok(());
        }

        let mut pending = vec![root.to_path_buf()];
        while let Some(dir) = pending.pop() {
            progress!(self, "Scanning directory: {}", dir.display());
            self.stats.directories += 1;

            let listing = match self.list_directory(&dir) {
                Ok(listing) => listing,
                Err(e) => {
                    self.fail(&ScanPath::from_path(&dir), e)?;
                    continue;
                }
            };

            for archive in &listing.archives {
                self.scan_archive_file(archive)?;
            }
            for class_file in &listing.class_files {
                self.scan_class_file(class_file)?;
            }

            // Reversed so the first subdirectory is popped, and finished, first
            pending.extend(listing.subdirs.into_iter().rev());
        }

        Ok(())
    }

    fn list_directory(&mut self, dir: &Path) -> Result<Listing> {
        let mut listing = Listing::default();

        for entry in fs::read_dir(dir)? {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.fail(&ScanPath::from_path(dir), e.into())?;
                    continue;
                }
            };
            let path = entry.path();

            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    self.fail(&ScanPath::from_path(&path), e.into())?;
                    continue;
                }
            };

            if file_type.is_dir() {
                listing.subdirs.push(path);
                continue;
            }

            // Linked directories are not descended, which rules out cycles.
            if file_type.is_symlink() && fs::metadata(&path).is_ok_and(|m| m.is_dir()) {
                progress!(self, "Not following directory link: {}", path.display());
                continue;
            }

            match FileKind::from_path(&path) {
                FileKind::Archive => listing.archives.push(path),
                FileKind::Class => listing.class_files.push(path),
                FileKind::Other => {}
            }
        }

        Ok(listing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VersionCatalog;
    use crate::config::ScanConfig;
    use crate::fixture::{class_bytes, ZipFixture};
    use crate::report::CollectingSink;
    use crate::ScanError;
    use tempfile::TempDir;

    fn scan(root: &Path) -> CollectingSink {
        let config = ScanConfig::default();
        let catalog = VersionCatalog::builtin();
        let mut scanner = Scanner::new(&config, &catalog, CollectingSink::default());
        scanner.scan(root).unwrap();
        scanner.into_sink()
    }

    fn relative(sink: &CollectingSink, root: &Path) -> Vec<String> {
        let prefix = format!("{}/", root.display());
        sink.findings
            .iter()
            .map(|f| f.path.as_str().trim_start_matches(&prefix).to_string())
            .collect()
    }

    #[test]
    fn test_archives_then_classes_then_subdirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("c")).unwrap();

        fs::write(root.join("Top.class"), class_bytes(50)).unwrap();
        fs::write(
            root.join("lib.jar"),
            ZipFixture::new().stored("InJar.class", &class_bytes(49)).finish(),
        )
        .unwrap();
        fs::write(root.join("a/A.class"), class_bytes(48)).unwrap();
        fs::write(root.join("a/b/B.class"), class_bytes(47)).unwrap();
        fs::write(root.join("c/C.class"), class_bytes(46)).unwrap();

        let found = relative(&scan(root), root);
        assert_eq!(found.len(), 5);
        assert_eq!(&found[..2], ["lib.jar/InJar.class", "Top.class"]);

        // Subtrees are finished before their siblings start
        let a = found.iter().position(|p| p == "a/A.class").unwrap();
        let b = found.iter().position(|p| p == "a/b/B.class").unwrap();
        let c = found.iter().position(|p| p == "c/C.class").unwrap();
        assert_eq!(b, a + 1);
        assert!(c == 2 || c == 4, "c/ must not split a/ and a/b/: {found:?}");
    }

    #[test]
    fn test_non_directory_root_is_noop() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("Lone.class");
        fs::write(&file, class_bytes(50)).unwrap();

        let sink = scan(&file);
        assert!(sink.findings.is_empty());
        assert!(sink.failures.is_empty());

        let sink = scan(&dir.path().join("missing"));
        assert!(sink.findings.is_empty());
    }

    #[test]
    fn test_other_files_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("Foo.java"), b"class Foo {}").unwrap();
        fs::write(dir.path().join("notes.zip"), b"PK").unwrap();
        fs::create_dir(dir.path().join("classes.jar")).unwrap();

        let config = ScanConfig::default();
        let catalog = VersionCatalog::builtin();
        let mut scanner = Scanner::new(&config, &catalog, CollectingSink::default());
        let stats = scanner.scan(dir.path()).unwrap();

        // A directory named like an archive is walked, not opened
        assert_eq!(stats.directories, 2);
        assert_eq!(stats.archives, 0);
        assert_eq!(stats.class_files, 0);
        assert_eq!(stats.failures, 0);
    }

    #[test]
    fn test_listing_a_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain.txt");
        fs::write(&file, b"not a directory").unwrap();

        let config = ScanConfig::default();
        let catalog = VersionCatalog::builtin();
        let mut scanner = Scanner::new(&config, &catalog, CollectingSink::default());
        let err = scanner.list_directory(&file).unwrap_err();
        assert!(matches!(err, ScanError::Io(_)));
        assert!(!err.is_fatal());
    }

    #[cfg(unix)]
    #[test]
    fn test_unlistable_directory_skipped_walk_continues() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let locked = root.join("locked");
        fs::create_dir_all(root.join("open")).unwrap();
        fs::create_dir(&locked).unwrap();
        fs::write(root.join("Top.class"), class_bytes(50)).unwrap();
        fs::write(root.join("open/Open.class"), class_bytes(49)).unwrap();
        fs::write(locked.join("Hidden.class"), class_bytes(51)).unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Permission bits do not apply to this user (root)
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let config = ScanConfig::default();
        let catalog = VersionCatalog::builtin();
        let mut scanner = Scanner::new(&config, &catalog, CollectingSink::default());
        let stats = scanner.scan(root).unwrap();
        let sink = scanner.into_sink();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let mut found = relative(&sink, root);
        found.sort();
        assert_eq!(found, ["Top.class", "open/Open.class"]);

        assert_eq!(sink.failures.len(), 1);
        assert_eq!(sink.failures[0].0, ScanPath::from_path(&locked));
        assert!(sink.failures[0].1.starts_with("I/O error"));
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.directories, 3);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_links_not_followed() {
        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("sub");
        fs::create_dir(&sub).unwrap();
        fs::write(sub.join("S.class"), class_bytes(50)).unwrap();
        std::os::unix::fs::symlink(dir.path(), sub.join("loop")).unwrap();
        std::os::unix::fs::symlink(sub.join("S.class"), dir.path().join("Linked.class")).unwrap();

        let found = relative(&scan(dir.path()), dir.path());
        assert_eq!(found, ["Linked.class", "sub/S.class"]);
    }
}
