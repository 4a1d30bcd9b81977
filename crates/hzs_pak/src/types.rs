//! Base types for the fixed structures of a pak file.

use binrw::{binread, BinRead};

use crate::compression::CompressionMethod;

/// Magic number found at the start of the footer
pub const PAK_MAGIC: u32 = 0x5A6F12E1;

/// Distance from the end of the container to the start of the footer
pub const DEFAULT_FOOTER_SIZE: u64 = 204;

/// Bytes taken by the footer fields before the method name list
pub const FOOTER_FIXED_SIZE: u64 = 4 + 4 + 8 + 8 + 20 + 1 + 16 + 4;

/// Width of one null-padded compression method name
pub const COMPRESSION_NAME_SIZE: u64 = 32;

/// Length of a SHA-1 digest as stored in the index
pub const HASH_SIZE: usize = 20;

/// Compression method name as stored in the footer
///
/// Names are ASCII, padded to 32 bytes with NULs.
#[derive(BinRead, Debug, Clone, Default, PartialEq, Eq)]
#[br(map = |raw: [u8; 32]| CompressionName::from_raw(&raw))]
pub struct CompressionName(pub String);

impl CompressionName {
    fn from_raw(raw: &[u8]) -> Self {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        CompressionName(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

/// Pak footer
///
/// Located [`DEFAULT_FOOTER_SIZE`] bytes before the end of the container. Every
/// value is stored in little endian.
#[binread]
#[derive(Debug, Clone, PartialEq)]
#[br(little, magic = 0x5A6F12E1u32, import(footer_size: u64))]
pub struct ContainerInfo {
    /// Always [`PAK_MAGIC`]
    #[br(calc = PAK_MAGIC)]
    pub magic: u32,

    /// Format version of the archive
    pub version: u32,

    /// Offset from the start of the container to the primary index
    pub index_offset: u64,

    /// Length of the (possibly encrypted) primary index
    pub index_size: u64,

    /// SHA-1 of the index, not verified
    pub index_hash: [u8; HASH_SIZE],

    /// Whether the index and directory blocks are encrypted
    #[br(map = |b: u8| b != 0)]
    pub encrypted: bool,

    /// Identifies the key the archive was encrypted with
    pub encryption_key_guid: [u8; 16],

    #[br(temp)]
    #[br(assert(
        u64::from(method_count) * COMPRESSION_NAME_SIZE <= footer_size.saturating_sub(FOOTER_FIXED_SIZE),
        "{} compression methods do not fit in a {} byte footer", method_count, footer_size
    ))]
    method_count: u32,

    /// Method names for indices `1..`
    #[br(count = method_count)]
    pub compression_methods: Vec<CompressionName>,
}

impl ContainerInfo {
    /// Resolve the compression method for an entry's method index.
    ///
    /// Index `0` is always stored data. When the footer lists no names at all,
    /// index `1` is taken to be zlib.
    pub fn compression_method(&self, index: u32) -> Option<CompressionMethod> {
        if index == 0 {
            return Some(CompressionMethod::None);
        }

        match self.compression_methods.get(index as usize - 1) {
            Some(name) => Some(CompressionMethod::from_name(&name.0)),
            None if index == 1 && self.compression_methods.is_empty() => {
                Some(CompressionMethod::Zlib)
            }
            None => None,
        }
    }
}

/// Location of a secondary index block inside the container
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[br(little)]
pub struct IndexDescriptor {
    /// Absolute offset in the container
    pub offset: i64,

    /// Length of the block in bytes
    pub size: i64,

    /// SHA-1 of the block, not verified
    pub hash: [u8; HASH_SIZE],
}

/// Byte range of one compressed block, relative to the start of the entry body
#[derive(BinRead, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[br(little)]
pub struct BlockRange {
    /// First byte of the block
    pub start: u64,

    /// One past the last byte of the block
    pub end: u64,
}

impl BlockRange {
    /// Size of the block on disk
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// Whether the block covers no bytes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
