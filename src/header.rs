//! Class file header reader
//!
//! A class file starts with a 4-byte magic and a 2-byte minor version, then
//! the 2-byte big-endian major version this crate calls the format code.
//! The reader consumes exactly those 8 bytes and never seeks, so it behaves
//! the same over a file handle and over a forward-only decompression stream.

use std::io::{self, Read};

use crate::{Result, ScanError};

/// Bytes preceding the format code
pub const SKIP_LEN: usize = 6;

/// Bytes consumed to extract the format code
pub const HEADER_LEN: usize = SKIP_LEN + 2;

/// Read the class file format code from the start of `source`
///
/// The stream is left positioned right after the marker and is not closed.
///
/// # Errors
///
/// Returns [`ScanError::Truncated`] if fewer than 8 bytes are available, or
/// the underlying I/O error if reading fails.
pub fn extract_format_code<R: Read + ?Sized>(source: &mut R) -> Result<u16> {
    let mut header = [0u8; HEADER_LEN];
    let mut filled = 0;

    // Sources may hand out a single byte per call; keep pulling until full.
    while filled < HEADER_LEN {
        match source.read(&mut header[filled..]) {
            Ok(0) => return Err(ScanError::Truncated { found: filled }),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(ScanError::Io(e)),
        }
    }

    Ok(u16::from_be_bytes([header[SKIP_LEN], header[SKIP_LEN + 1]]))
}
