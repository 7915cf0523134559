//! Deterministic archive and class file builders for unit tests
//!
//! Archives are Zip32 with fixed timestamps. Entries may defer their CRC and
//! sizes to a data descriptor the way jar tools do.

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::archive::{METHOD_DEFLATE, METHOD_STORED};

/// Minimal class file body with the given format code
pub fn class_bytes(code: u16) -> Vec<u8> {
    let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00];
    out.extend_from_slice(&code.to_be_bytes());
    // constant pool count and a little filler so entries are not header-only
    out.extend_from_slice(&[0x00, 0x10, 0x0A, 0x00, 0x03, 0x00, 0x0D]);
    out
}

fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Builder for zip bytes
#[derive(Default)]
pub struct ZipFixture {
    out: Vec<u8>,
    central: Vec<u8>,
    count: u16,
}

impl ZipFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stored(self, name: &str, data: &[u8]) -> Self {
        self.raw_entry(name, METHOD_STORED, 0, data, crc32fast::hash(data))
    }

    pub fn deflated(self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        self.push(name, METHOD_DEFLATE, 0, &compressed, data.len(), crc32fast::hash(data), false)
    }

    pub fn deflated_with_descriptor(self, name: &str, data: &[u8]) -> Self {
        let compressed = deflate(data);
        self.push(
            name,
            METHOD_DEFLATE,
            0x0008,
            &compressed,
            data.len(),
            crc32fast::hash(data),
            true,
        )
    }

    pub fn directory(self, name: &str) -> Self {
        self.stored(name, &[])
    }

    /// Entry whose payload is written verbatim with the given header fields
    pub fn raw_entry(self, name: &str, method: u16, flags: u16, payload: &[u8], crc: u32) -> Self {
        self.push(name, method, flags, payload, payload.len(), crc, false)
    }

    #[allow(clippy::too_many_arguments)]
    fn push(
        mut self,
        name: &str,
        method: u16,
        flags: u16,
        payload: &[u8],
        uncompressed_len: usize,
        crc: u32,
        descriptor: bool,
    ) -> Self {
        let offset = self.out.len() as u32;
        let (lfh_crc, lfh_csize, lfh_usize) = if descriptor {
            (0, 0, 0)
        } else {
            (crc, payload.len() as u32, uncompressed_len as u32)
        };

        let out = &mut self.out;
        out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&lfh_crc.to_le_bytes());
        out.extend_from_slice(&lfh_csize.to_le_bytes());
        out.extend_from_slice(&lfh_usize.to_le_bytes());
        out.extend_from_slice(&(name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(payload);

        if descriptor {
            out.extend_from_slice(&0x0807_4b50u32.to_le_bytes());
            out.extend_from_slice(&crc.to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.extend_from_slice(&(uncompressed_len as u32).to_le_bytes());
        }

        let cd = &mut self.central;
        cd.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
        cd.extend_from_slice(&20u16.to_le_bytes());
        cd.extend_from_slice(&20u16.to_le_bytes());
        cd.extend_from_slice(&flags.to_le_bytes());
        cd.extend_from_slice(&method.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&crc.to_le_bytes());
        cd.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        cd.extend_from_slice(&(uncompressed_len as u32).to_le_bytes());
        cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u16.to_le_bytes());
        cd.extend_from_slice(&0u32.to_le_bytes());
        cd.extend_from_slice(&offset.to_le_bytes());
        cd.extend_from_slice(name.as_bytes());

        self.count += 1;
        self
    }

    pub fn finish(mut self) -> Vec<u8> {
        let cd_start = self.out.len() as u32;
        let cd_size = self.central.len() as u32;
        self.out.extend_from_slice(&self.central);

        self.out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        self.out.extend_from_slice(&0u16.to_le_bytes());
        self.out.extend_from_slice(&0u16.to_le_bytes());
        self.out.extend_from_slice(&self.count.to_le_bytes());
        self.out.extend_from_slice(&self.count.to_le_bytes());
        self.out.extend_from_slice(&cd_size.to_le_bytes());
        self.out.extend_from_slice(&cd_start.to_le_bytes());
        self.out.extend_from_slice(&0u16.to_le_bytes());
        self.out
    }
}
