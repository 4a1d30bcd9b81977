//! Block compression handling.

use std::{
    fmt,
    io::{self, Read},
};

use flate2::read::ZlibDecoder;
use tracing::instrument;

/// Identifies the storage format used for an entry's payload
///
/// Entries refer to methods by index. Index `0` is always [`CompressionMethod::None`];
/// every other index is resolved through the names listed in the footer, see
/// [`crate::types::ContainerInfo::compression_method`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Zlib wrapped deflate streams, one per block
    Zlib,

    /// Gzip wrapped deflate streams
    Gzip,

    /// Oodle, as used by later engine versions
    Oodle,

    /// Any other name found in the footer
    Other(String),
}

impl CompressionMethod {
    /// Resolve a footer method name, ignoring case
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "" | "none" => CompressionMethod::None,
            "zlib" => CompressionMethod::Zlib,
            "gzip" => CompressionMethod::Gzip,
            "oodle" => CompressionMethod::Oodle,
            _ => CompressionMethod::Other(name.to_owned()),
        }
    }

    /// Name as it would appear in the footer
    pub fn name(&self) -> &str {
        match self {
            CompressionMethod::None => "None",
            CompressionMethod::Zlib => "Zlib",
            CompressionMethod::Gzip => "Gzip",
            CompressionMethod::Oodle => "Oodle",
            CompressionMethod::Other(name) => name,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Inflate one zlib block onto `out`, stopping after `limit` bytes.
#[instrument(skip(data, out), fields(len = data.len()))]
pub(crate) fn inflate_block(data: &[u8], limit: u64, out: &mut Vec<u8>) -> io::Result<usize> {
    ZlibDecoder::new(data).take(limit).read_to_end(out)
}
