//! Forward-only zip entry stream
//!
//! Entries are read from local file headers in stored order; the central
//! directory is never consulted, so the source only has to be `BufRead`.
//! That lets an entry of one archive be opened as another archive without
//! buffering or seeking.
//!
//! # Invariants
//! - At most one entry is open at a time. `next_entry` drains whatever the
//!   caller left unread (plus any data descriptor) before parsing the next
//!   header, so the cursor is always at a record boundary.
//! - An entry reader never yields bytes past its entry: stored payloads are
//!   bounded by their size, deflate payloads end where the deflate stream
//!   ends (and by their compressed size when it is known).
//! - Every fully drained payload is checked against its CRC-32.

use std::io::{self, BufRead, Read};

use crc32fast::Hasher;
use flate2::{Decompress, FlushDecompress, Status};

use super::format::{
    signature, DataDescriptor, EntryHeader, LocalHeaderFields, LOCAL_HEADER_TAIL_LEN,
    METHOD_DEFLATE, METHOD_STORED, SIG_CENTRAL_DIR, SIG_DATA_DESCRIPTOR, SIG_END_OF_CENTRAL_DIR,
    SIG_LOCAL_HEADER, SIG_ZIP64_END_OF_CENTRAL_DIR,
};
use crate::{Result, ScanError};

/// Scratch size used when skipping unread entry data
const DRAIN_CHUNK: usize = 8 * 1024;

enum Payload {
    Stored {
        remaining: u64,
    },
    Deflate {
        inflater: Box<Decompress>,
        /// Compressed bytes left, when the header records the size
        remaining: Option<u64>,
        done: bool,
    },
    /// Entry of known size that this reader cannot decode
    Opaque {
        remaining: u64,
    },
}

struct OpenEntry {
    header: EntryHeader,
    payload: Payload,
    hasher: Hasher,
    produced: u64,
    failed: bool,
}

/// Sequential reader over the entries of a zip-family archive
pub struct ZipStream<R> {
    inner: R,
    current: Option<OpenEntry>,
    entries: u64,
    finished: bool,
}

fn corrupt(msg: impl Into<String>) -> ScanError {
    ScanError::ArchiveCorruption(msg.into())
}

impl<R: BufRead> ZipStream<R> {
    /// Wrap a buffered source positioned at the first local file header
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            current: None,
            entries: 0,
            finished: false,
        }
    }

    /// Number of entry headers read so far
    #[must_use]
    pub fn entries_read(&self) -> u64 {
        self.entries
    }

    /// Advance to the next entry
    ///
    /// Returns `None` at the central directory or at a clean end of input.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ArchiveCorruption`] if the previous entry cannot
    /// be drained or verified, or if the next record is malformed. The stream
    /// yields no further entries after an error.
    pub fn next_entry(&mut self) -> Result<Option<EntryHeader>> {
        if let Err(e) = self.finish_entry() {
            self.finished = true;
            return Err(e);
        }
        if self.finished {
            return Ok(None);
        }

        match self.read_entry_header() {
            Ok(Some(header)) => Ok(Some(header)),
            Ok(None) => {
                self.finished = true;
                Ok(None)
            }
            Err(e) => {
                self.finished = true;
                Err(e)
            }
        }
    }

    /// Reader over the payload of the current entry
    ///
    /// Yields nothing if no entry is open.
    pub fn entry_reader(&mut self) -> EntryReader<'_, R> {
        EntryReader { stream: self }
    }

    fn read_entry_header(&mut self) -> Result<Option<EntryHeader>> {
        let Some(sig) = self.read_signature()? else {
            return Ok(None);
        };

        match sig {
            SIG_LOCAL_HEADER => {}
            SIG_CENTRAL_DIR | SIG_END_OF_CENTRAL_DIR | SIG_ZIP64_END_OF_CENTRAL_DIR => {
                return Ok(None);
            }
            other => {
                return Err(corrupt(format!(
                    "unexpected record signature {other:#010x} after {} entries",
                    self.entries
                )));
            }
        }

        let mut tail = [0u8; LOCAL_HEADER_TAIL_LEN];
        self.read_record(&mut tail, "local file header")?;
        let fields = LocalHeaderFields::parse(&tail);

        let mut name = vec![0u8; usize::from(fields.name_len)];
        self.read_record(&mut name, "entry name")?;
        let mut extra = vec![0u8; usize::from(fields.extra_len)];
        self.read_record(&mut extra, "extra field")?;

        let header = fields.into_header(&name, &extra);
        let payload = payload_for(&header)?;

        self.entries += 1;
        self.current = Some(OpenEntry {
            header: header.clone(),
            payload,
            hasher: Hasher::new(),
            produced: 0,
            failed: false,
        });

        Ok(Some(header))
    }

    /// Read a record signature; `None` on a clean end of input
    fn read_signature(&mut self) -> Result<Option<u32>> {
        let mut raw = [0u8; 4];
        let mut filled = 0;
        while filled < raw.len() {
            match self.inner.read(&mut raw[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(corrupt("archive ends inside a record signature")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(ScanError::Io(e)),
            }
        }
        Ok(Some(signature(raw)))
    }

    fn read_record(&mut self, buf: &mut [u8], what: &str) -> Result<()> {
        self.inner.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                corrupt(format!("archive ends inside {what}"))
            } else {
                ScanError::Io(e)
            }
        })
    }

    fn skip_raw(&mut self, mut count: u64, name: &str) -> Result<()> {
        while count > 0 {
            let avail = self.inner.fill_buf()?;
            if avail.is_empty() {
                return Err(corrupt(format!("archive ends inside entry {name}")));
            }
            let n = avail.len().min(usize::try_from(count).unwrap_or(usize::MAX));
            self.inner.consume(n);
            count -= n as u64;
        }
        Ok(())
    }

    fn read_descriptor(&mut self, zip64: bool) -> Result<DataDescriptor> {
        let mut first = [0u8; 4];
        self.read_record(&mut first, "data descriptor")?;

        let len = DataDescriptor::fields_len(zip64);
        let mut fields = [0u8; 20];
        // The descriptor signature is optional; without it the CRC comes first.
        if signature(first) == SIG_DATA_DESCRIPTOR {
            self.read_record(&mut fields[..len], "data descriptor")?;
        } else {
            fields[..4].copy_from_slice(&first);
            self.read_record(&mut fields[4..len], "data descriptor")?;
        }
        Ok(DataDescriptor::parse(&fields[..len], zip64))
    }

    /// Consume the rest of the open entry and verify it
    fn finish_entry(&mut self) -> Result<()> {
        let Some(mut entry) = self.current.take() else {
            return Ok(());
        };

        if entry.failed {
            return Err(corrupt(format!(
                "entry {} could not be read to its end",
                entry.header.name
            )));
        }

        if let Payload::Opaque { remaining } = entry.payload {
            self.skip_raw(remaining, &entry.header.name)?;
            if entry.header.has_data_descriptor() {
                self.read_descriptor(entry.header.zip64)?;
            }
            return Ok(());
        }

        let mut scratch = [0u8; DRAIN_CHUNK];
        loop {
            match read_payload(&mut self.inner, &mut entry, &mut scratch) {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    return Err(corrupt(format!("entry {}: {e}", entry.header.name)));
                }
            }
        }

        // Padding between the end of a sized deflate stream and the next record
        if let Payload::Deflate {
            remaining: Some(left),
            ..
        } = entry.payload
        {
            self.skip_raw(left, &entry.header.name)?;
        }

        let expected_crc = if entry.header.has_data_descriptor() {
            self.read_descriptor(entry.header.zip64)?.crc32
        } else {
            if let Some(size) = entry.header.uncompressed_size {
                if size != entry.produced {
                    return Err(corrupt(format!(
                        "entry {} holds {} bytes, header records {size}",
                        entry.header.name, entry.produced
                    )));
                }
            }
            entry.header.crc32
        };

        let actual_crc = entry.hasher.finalize();
        if actual_crc != expected_crc {
            return Err(corrupt(format!(
                "entry {} failed CRC check: expected {expected_crc:#010x}, got {actual_crc:#010x}",
                entry.header.name
            )));
        }

        Ok(())
    }
}

fn payload_for(header: &EntryHeader) -> Result<Payload> {
    if !header.is_readable() {
        return match header.compressed_size {
            Some(remaining) => Ok(Payload::Opaque { remaining }),
            None => Err(ScanError::UnsupportedEntry(format!(
                "{}: cannot locate the end of an entry with method {} and deferred size",
                header.name, header.method
            ))),
        };
    }

    match (header.method, header.compressed_size) {
        (METHOD_STORED, Some(remaining)) => Ok(Payload::Stored { remaining }),
        (METHOD_STORED, None) => Err(corrupt(format!(
            "stored entry {} defers its size to a data descriptor",
            header.name
        ))),
        (METHOD_DEFLATE, remaining) => Ok(Payload::Deflate {
            inflater: Box::new(Decompress::new(false)),
            remaining,
            done: false,
        }),
        (method, _) => Err(ScanError::UnsupportedEntry(format!(
            "{}: compression method {method}",
            header.name
        ))),
    }
}

fn read_payload<R: BufRead>(
    inner: &mut R,
    entry: &mut OpenEntry,
    buf: &mut [u8],
) -> io::Result<usize> {
    if buf.is_empty() {
        return Ok(0);
    }

    let n = match &mut entry.payload {
        Payload::Stored { remaining } => {
            if *remaining == 0 {
                return Ok(0);
            }
            let avail = inner.fill_buf()?;
            if avail.is_empty() {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "archive ends inside stored entry data",
                ));
            }
            let n = avail
                .len()
                .min(buf.len())
                .min(usize::try_from(*remaining).unwrap_or(usize::MAX));
            buf[..n].copy_from_slice(&avail[..n]);
            inner.consume(n);
            *remaining -= n as u64;
            n
        }
        Payload::Deflate {
            inflater,
            remaining,
            done,
        } => inflate(inner, inflater, remaining, done, buf)?,
        Payload::Opaque { .. } => {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!(
                    "entry {} uses unsupported compression method {}",
                    entry.header.name, entry.header.method
                ),
            ));
        }
    };

    entry.hasher.update(&buf[..n]);
    entry.produced += n as u64;
    Ok(n)
}

fn inflate<R: BufRead>(
    inner: &mut R,
    inflater: &mut Decompress,
    remaining: &mut Option<u64>,
    done: &mut bool,
    out: &mut [u8],
) -> io::Result<usize> {
    loop {
        if *done {
            return Ok(0);
        }

        let input = inner.fill_buf()?;
        let limit = match *remaining {
            Some(left) => input.len().min(usize::try_from(left).unwrap_or(usize::MAX)),
            None => input.len(),
        };
        let input = &input[..limit];
        let exhausted = input.is_empty();

        let before_in = inflater.total_in();
        let before_out = inflater.total_out();
        let status = inflater
            .decompress(input, out, FlushDecompress::None)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let consumed = (inflater.total_in() - before_in) as usize;
        let produced = (inflater.total_out() - before_out) as usize;

        inner.consume(consumed);
        if let Some(left) = remaining.as_mut() {
            *left -= consumed as u64;
        }
        if status == Status::StreamEnd {
            *done = true;
        }

        if produced > 0 || *done {
            return Ok(produced);
        }
        if exhausted {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "compressed data ends before the deflate stream",
            ));
        }
        if consumed == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "deflate stream made no progress",
            ));
        }
    }
}

/// Payload of the entry most recently returned by [`ZipStream::next_entry`]
///
/// Reports end of data at the entry boundary even though the underlying
/// archive continues.
pub struct EntryReader<'a, R> {
    stream: &'a mut ZipStream<R>,
}

impl<R: BufRead> Read for EntryReader<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let ZipStream { inner, current, .. } = &mut *self.stream;
        let Some(entry) = current.as_mut() else {
            return Ok(0);
        };
        if entry.failed {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("entry {} is no longer readable", entry.header.name),
            ));
        }

        match read_payload(inner, entry, buf) {
            Ok(n) => Ok(n),
            Err(e) => {
                // A partial read leaves the cursor mid-entry; the archive cannot continue.
                if !matches!(
                    e.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::Unsupported
                ) {
                    entry.failed = true;
                }
                Err(e)
            }
        }
    }
}
