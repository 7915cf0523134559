//! Zip record layouts used by the streaming reader
//!
//! Only the records that appear in stored order are parsed: local file
//! headers and data descriptors. The first central directory or
//! end-of-central-directory signature ends the entry sequence.

/// Local file header: `PK\x03\x04`
pub const SIG_LOCAL_HEADER: u32 = 0x0403_4b50;
/// Central directory file header: `PK\x01\x02`
pub const SIG_CENTRAL_DIR: u32 = 0x0201_4b50;
/// End of central directory: `PK\x05\x06`
pub const SIG_END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
/// Zip64 end of central directory: `PK\x06\x06`
pub const SIG_ZIP64_END_OF_CENTRAL_DIR: u32 = 0x0606_4b50;
/// Optional data descriptor signature: `PK\x07\x08`
pub const SIG_DATA_DESCRIPTOR: u32 = 0x0807_4b50;

/// Local header length after the 4-byte signature
pub const LOCAL_HEADER_TAIL_LEN: usize = 26;

/// Stored (no compression)
pub const METHOD_STORED: u16 = 0;
/// Raw deflate
pub const METHOD_DEFLATE: u16 = 8;

const FLAG_ENCRYPTED: u16 = 0x0001;
const FLAG_DATA_DESCRIPTOR: u16 = 0x0008;

const ZIP64_EXTRA_ID: u16 = 0x0001;
const ZIP64_SENTINEL: u32 = 0xFFFF_FFFF;

/// Metadata of one archive entry, taken from its local file header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHeader {
    /// Entry name as stored (lossily decoded)
    pub name: String,
    /// General purpose bit flags
    pub flags: u16,
    /// Compression method
    pub method: u16,
    /// CRC-32 of the uncompressed payload (0 when deferred to a descriptor)
    pub crc32: u32,
    /// Compressed payload size, unless deferred to a data descriptor
    pub compressed_size: Option<u64>,
    /// Uncompressed payload size, unless deferred to a data descriptor
    pub uncompressed_size: Option<u64>,
    /// Sizes are 64-bit (affects the data descriptor layout)
    pub zip64: bool,
}

impl EntryHeader {
    /// Directory entries carry no payload
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/') || self.name.ends_with('\\')
    }

    /// Entry payload is encrypted
    #[must_use]
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Sizes and CRC follow the payload in a data descriptor
    #[must_use]
    pub fn has_data_descriptor(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0
    }

    /// Whether the payload can be decoded by this reader
    #[must_use]
    pub fn is_readable(&self) -> bool {
        !self.is_encrypted() && matches!(self.method, METHOD_STORED | METHOD_DEFLATE)
    }
}

/// Fixed-size part of a local file header
#[derive(Debug, Clone, Copy)]
pub struct LocalHeaderFields {
    pub flags: u16,
    pub method: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_len: u16,
    pub extra_len: u16,
}

#[inline]
fn u16_at(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

#[inline]
fn u32_at(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
fn u64_at(buf: &[u8], off: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(raw)
}

/// Decode a little-endian u32 signature
#[inline]
pub fn signature(raw: [u8; 4]) -> u32 {
    u32::from_le_bytes(raw)
}

impl LocalHeaderFields {
    /// Parse the 26 bytes following a local header signature
    pub fn parse(tail: &[u8; LOCAL_HEADER_TAIL_LEN]) -> Self {
        // version needed (0..2), mod time (6..8) and mod date (8..10) are unused
        Self {
            flags: u16_at(tail, 2),
            method: u16_at(tail, 4),
            crc32: u32_at(tail, 10),
            compressed_size: u32_at(tail, 14),
            uncompressed_size: u32_at(tail, 18),
            name_len: u16_at(tail, 22),
            extra_len: u16_at(tail, 24),
        }
    }

    /// Build the entry header once name and extra field have been read
    pub fn into_header(self, name: &[u8], extra: &[u8]) -> EntryHeader {
        let name = String::from_utf8_lossy(name).into_owned();

        let mut compressed = u64::from(self.compressed_size);
        let mut uncompressed = u64::from(self.uncompressed_size);
        // Any Zip64 extra block widens the data descriptor sizes to 8 bytes.
        let zip64_field = find_extra(extra, ZIP64_EXTRA_ID);
        let zip64 = zip64_field.is_some();

        if let Some(field) = zip64_field {
            // Only the sentinel-valued sizes are present, uncompressed first.
            let mut off = 0;
            if self.uncompressed_size == ZIP64_SENTINEL && field.len() >= off + 8 {
                uncompressed = u64_at(field, off);
                off += 8;
            }
            if self.compressed_size == ZIP64_SENTINEL && field.len() >= off + 8 {
                compressed = u64_at(field, off);
            }
        }

        let deferred = self.flags & FLAG_DATA_DESCRIPTOR != 0;
        EntryHeader {
            name,
            flags: self.flags,
            method: self.method,
            crc32: self.crc32,
            compressed_size: (!deferred || compressed != 0).then_some(compressed),
            uncompressed_size: (!deferred || uncompressed != 0).then_some(uncompressed),
            zip64,
        }
    }
}

/// Find an extra field block by header id
fn find_extra(mut extra: &[u8], id: u16) -> Option<&[u8]> {
    while extra.len() >= 4 {
        let block_id = u16_at(extra, 0);
        let len = usize::from(u16_at(extra, 2));
        let body = extra.get(4..4 + len)?;
        if block_id == id {
            return Some(body);
        }
        extra = &extra[4 + len..];
    }
    None
}

/// CRC and sizes recorded after an entry's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

impl DataDescriptor {
    /// Parse descriptor fields (after the optional signature)
    pub fn parse(fields: &[u8], zip64: bool) -> Self {
        if zip64 {
            Self {
                crc32: u32_at(fields, 0),
                compressed_size: u64_at(fields, 4),
                uncompressed_size: u64_at(fields, 12),
            }
        } else {
            Self {
                crc32: u32_at(fields, 0),
                compressed_size: u64::from(u32_at(fields, 4)),
                uncompressed_size: u64::from(u32_at(fields, 8)),
            }
        }
    }

    /// Length of the descriptor fields (excluding the optional signature)
    pub fn fields_len(zip64: bool) -> usize {
        if zip64 {
            20
        } else {
            12
        }
    }
}
