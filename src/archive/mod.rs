//! Streaming reader for zip-family archives (jar, war, ear, sar, ...)

mod format;
mod stream;

pub use format::{EntryHeader, METHOD_DEFLATE, METHOD_STORED};
pub use stream::{EntryReader, ZipStream};
