//! Archive traversal

use std::io::{BufRead, BufReader};

use crate::archive::ZipStream;
use crate::header::extract_format_code;
use crate::path::{FileKind, ScanPath};
use crate::report::ScanSink;
use crate::{Result, ScanError};

use super::Scanner;

impl<S: ScanSink> Scanner<'_, S> {
    /// Walk the entries of an open archive stream
    ///
    /// `depth` is the nesting level of this archive (1 for a file on disk).
    /// Per-entry failures go to the sink; an error returned from here means
    /// the archive itself could not be read further.
    pub(super) fn walk_archive(
        &mut self,
        stream: &mut ZipStream<&mut dyn BufRead>,
        archive_path: &ScanPath,
        depth: usize,
    ) -> Result<()> {
        while let Some(entry) = stream.next_entry()? {
            self.stats.archive_entries += 1;
            if entry.is_dir() {
                continue;
            }

            let kind = FileKind::from_name(&entry.name);
            if kind == FileKind::Other {
                continue;
            }

            let path = archive_path.join_entry(&entry.name);
            if !entry.is_readable() {
                self.fail(
                    &path,
                    ScanError::UnsupportedEntry(format!(
                        "compression method {}{}",
                        entry.method,
                        if entry.is_encrypted() { ", encrypted" } else { "" }
                    )),
                )?;
                continue;
            }

            match kind {
                FileKind::Class => {
                    progress!(self, "Processing class file: {path}");
                    match extract_format_code(&mut stream.entry_reader()) {
                        Ok(code) => self.classify(path, code)?,
                        Err(e) => self.fail(&path, e)?,
                    }
                }
                FileKind::Archive => {
                    let nested_depth = depth + 1;
                    if nested_depth > self.config.max_archive_depth {
                        self.fail(
                            &path,
                            ScanError::RecursionLimit {
                                depth: nested_depth,
                                limit: self.config.max_archive_depth,
                            },
                        )?;
                        continue;
                    }

                    progress!(self, "Recursing into: {path}");
                    self.stats.archives += 1;

                    let mut reader = BufReader::new(stream.entry_reader());
                    let mut nested = ZipStream::new(&mut reader as &mut dyn BufRead);
                    if let Err(e) = self.walk_archive(&mut nested, &path, nested_depth) {
                        self.fail(&path, e)?;
                    }
                }
                FileKind::Other => {}
            }
        }

        Ok(())
    }
}
