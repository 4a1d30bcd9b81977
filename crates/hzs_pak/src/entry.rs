//! Entry record codec.
//!
//! Every record in the encoded-entries table starts with a 32-bit flags word:
//!
//! | Bits    | Meaning                                                   |
//! |---------|-----------------------------------------------------------|
//! | 0 - 5   | Compression method index, `0x3F` marks a full record      |
//! | 6       | Payload is encrypted                                      |
//! | 7 - 17  | Number of compression blocks                              |
//! | 29      | On-disk size stored as 32 bits (compact records only)     |
//! | 30      | Uncompressed size stored as 32 bits (compact records only)|
//! | 31      | Body offset stored as 32 bits (compact records only)      |
//!
//! A full record stores every field at its widest. A compact record only
//! stores what the flags call for.

use std::{
    io::{self, Cursor, ErrorKind, Read},
    ops::Deref,
};

use binrw::BinReaderExt;
use byteorder::{LittleEndian, ReadBytesExt};
use tracing::trace;

use crate::{
    error::{Error, FormatError, Result},
    types::{BlockRange, HASH_SIZE},
};

/// Method index value which marks a full record
pub const FULL_RECORD_MARKER: u32 = 0x3F;

/// Flags word at the start of every encoded record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFlags(pub u32);

impl EntryFlags {
    /// Compression method index, meaningful for compact records only
    pub fn compression_index(self) -> u32 {
        self.0 & 0x3F
    }

    /// Whether a full record follows
    pub fn is_full(self) -> bool {
        self.compression_index() == FULL_RECORD_MARKER
    }

    pub fn encrypted(self) -> bool {
        self.0 & (1 << 6) != 0
    }

    pub fn block_count(self) -> u32 {
        (self.0 >> 7) & 0x7FF
    }

    pub fn size_is_32bit(self) -> bool {
        self.0 & (1 << 29) != 0
    }

    pub fn uncompressed_size_is_32bit(self) -> bool {
        self.0 & (1 << 30) != 0
    }

    pub fn offset_is_32bit(self) -> bool {
        self.0 & (1 << 31) != 0
    }
}

/// Logical description of one file, independent of how its record was encoded
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PakEntry {
    /// Absolute offset of the entry body in the container
    pub offset: u64,

    /// Bytes the body occupies on disk
    pub size: u64,

    /// Bytes once decompressed
    pub uncompressed_size: u64,

    /// Index into the footer's compression methods, `0` for stored data
    pub compression_method: u32,

    /// Whether the payload is encrypted
    pub encrypted: bool,

    /// Uncompressed size of every block but the last
    pub block_size: u32,

    /// Compressed blocks, relative to the start of the body
    pub blocks: Vec<BlockRange>,
}

impl PakEntry {
    /// Whether the payload is stored without compression
    pub fn is_stored(&self) -> bool {
        self.compression_method == 0
    }

    /// Uncompressed size of each block, in order
    pub fn block_uncompressed_sizes(&self) -> impl Iterator<Item = u64> + '_ {
        let block_size = u64::from(self.block_size);
        (0..self.blocks.len() as u64).map(move |i| {
            self.uncompressed_size
                .saturating_sub(i.saturating_mul(block_size))
                .min(block_size)
        })
    }

    /// Sanity checks applied before any payload is read.
    ///
    /// Fails with [`Error::CorruptEntry`] when the body lies outside the
    /// container, the size is zero or not below `max_entry_size`, or the block
    /// list contradicts the sizes.
    pub fn validate(&self, container_size: u64, max_entry_size: u64) -> Result<()> {
        if self.offset == 0 || self.offset >= container_size {
            return Err(Error::corrupt(
                self.offset,
                format!("body offset outside the {container_size} byte container"),
            ));
        }

        if self.size == 0 || self.size >= max_entry_size {
            return Err(Error::corrupt(
                self.offset,
                format!(
                    "on-disk size {} not within 1..{max_entry_size}",
                    self.size
                ),
            ));
        }

        if self.offset.saturating_add(self.size) > container_size {
            return Err(Error::corrupt(
                self.offset,
                format!("body of {} bytes runs past the container", self.size),
            ));
        }

        if self.is_stored() {
            if self.size != self.uncompressed_size {
                return Err(Error::corrupt(
                    self.offset,
                    format!(
                        "stored entry sizes differ ({} on disk, {} uncompressed)",
                        self.size, self.uncompressed_size
                    ),
                ));
            }
            if !self.blocks.is_empty() {
                return Err(Error::corrupt(self.offset, "stored entry lists blocks"));
            }
            return Ok(());
        }

        if self.blocks.is_empty() || self.block_size == 0 {
            return Err(Error::corrupt(
                self.offset,
                "compressed entry has no block layout",
            ));
        }

        let mut total = 0u64;
        for size in self.block_uncompressed_sizes() {
            if size == 0 {
                return Err(Error::corrupt(self.offset, "block list longer than the data"));
            }
            total += size;
        }
        if total != self.uncompressed_size {
            return Err(Error::corrupt(
                self.offset,
                format!(
                    "blocks cover {total} bytes, expected {}",
                    self.uncompressed_size
                ),
            ));
        }

        Ok(())
    }
}

/// A record decoded from the encoded-entries table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedEntry {
    /// Record stored with every field at full width
    Full {
        entry: PakEntry,
        hash: [u8; HASH_SIZE],
    },

    /// Bit-packed record
    Compact(PakEntry),
}

impl DecodedEntry {
    /// Shared view of the entry
    pub fn view(&self) -> &PakEntry {
        match self {
            DecodedEntry::Full { entry, .. } => entry,
            DecodedEntry::Compact(entry) => entry,
        }
    }

    /// Take the shared view
    pub fn into_view(self) -> PakEntry {
        match self {
            DecodedEntry::Full { entry, .. } => entry,
            DecodedEntry::Compact(entry) => entry,
        }
    }

    /// Whether this was a full record
    pub fn is_full(&self) -> bool {
        matches!(self, DecodedEntry::Full { .. })
    }

    /// Decode the record at `offset` in the encoded-entries table.
    ///
    /// Returns the entry and the number of bytes its record occupies, so the
    /// next record of a contiguous run starts at `offset + consumed`.
    pub fn decode(table: &[u8], offset: usize) -> Result<(DecodedEntry, usize)> {
        if offset >= table.len() {
            return Err(FormatError::Malformed {
                pos: offset as u64,
                message: format!("record offset past the {} byte table", table.len()),
            }
            .into());
        }

        let mut reader = Cursor::new(table);
        reader.set_position(offset as u64);

        let entry = decode_record(&mut reader)
            .map_err(|err| truncated(err, || format!("entry record at {offset:#x}")))?;
        let consumed = reader.position() as usize - offset;

        trace!(offset, consumed, full = entry.is_full(), "decoded entry");
        Ok((entry, consumed))
    }
}

impl Deref for DecodedEntry {
    type Target = PakEntry;

    fn deref(&self) -> &PakEntry {
        self.view()
    }
}

fn truncated(err: Error, context: impl FnOnce() -> String) -> Error {
    match err {
        Error::IOError(e) if e.kind() == ErrorKind::UnexpectedEof => {
            FormatError::Truncated(context()).into()
        }
        other => other,
    }
}

fn read_sized<R: Read>(reader: &mut R, narrow: bool) -> io::Result<u64> {
    if narrow {
        reader.read_u32::<LittleEndian>().map(u64::from)
    } else {
        reader.read_u64::<LittleEndian>()
    }
}

fn read_blocks<R: Read>(reader: &mut R, count: u32) -> Result<Vec<BlockRange>> {
    let mut reader = binrw::io::NoSeek::new(reader);
    (0..count)
        .map(|_| reader.read_le::<BlockRange>().map_err(Error::from))
        .collect()
}

fn decode_record(reader: &mut Cursor<&[u8]>) -> Result<DecodedEntry> {
    let flags = EntryFlags(reader.read_u32::<LittleEndian>()?);

    if flags.is_full() {
        let (entry, hash) = read_full_record(reader, flags.block_count())?;
        return Ok(DecodedEntry::Full { entry, hash });
    }

    let compression_method = flags.compression_index();
    let offset = read_sized(reader, flags.offset_is_32bit())?;
    let uncompressed_size = read_sized(reader, flags.uncompressed_size_is_32bit())?;

    let mut entry = PakEntry {
        offset,
        size: uncompressed_size,
        uncompressed_size,
        compression_method,
        encrypted: flags.encrypted(),
        ..Default::default()
    };

    if compression_method != 0 {
        entry.size = read_sized(reader, flags.size_is_32bit())?;
        entry.block_size = reader.read_u32::<LittleEndian>()?;
        entry.blocks = (0..flags.block_count())
            .map(|_| -> io::Result<BlockRange> {
                let start = reader.read_u32::<LittleEndian>()?;
                let end = reader.read_u32::<LittleEndian>()?;
                Ok(BlockRange {
                    start: start.into(),
                    end: end.into(),
                })
            })
            .collect::<io::Result<_>>()?;
    }

    Ok(DecodedEntry::Compact(entry))
}

/// Read the fields of a full record, after any flags word.
///
/// The same decoder reads the records in the encoded-entries table and the
/// header that precedes the data of every compressed body. Neither carries its
/// own block count, so `block_count` pairs follow when the method is not `0`.
pub(crate) fn read_full_record<R: Read>(
    reader: &mut R,
    block_count: u32,
) -> Result<(PakEntry, [u8; HASH_SIZE])> {
    let offset = reader.read_u64::<LittleEndian>()?;
    let size = reader.read_u64::<LittleEndian>()?;
    let uncompressed_size = reader.read_u64::<LittleEndian>()?;
    let compression_method = reader.read_u32::<LittleEndian>()?;

    let mut hash = [0u8; HASH_SIZE];
    reader.read_exact(&mut hash)?;

    let encrypted = reader.read_u8()? & 1 != 0;
    let block_size = reader.read_u32::<LittleEndian>()?;

    let blocks = if compression_method != 0 {
        read_blocks(reader, block_count)?
    } else {
        Vec::new()
    };

    let entry = PakEntry {
        offset,
        size,
        uncompressed_size,
        compression_method,
        encrypted,
        block_size,
        blocks,
    };
    Ok((entry, hash))
}

/// Read the header at the start of a compressed body.
///
/// The header is a full record without a flags word; its block count is the
/// one of the entry that points at the body.
pub(crate) fn read_body_header<R: Read>(reader: &mut R, block_count: u32) -> Result<PakEntry> {
    read_full_record(reader, block_count)
        .map(|(entry, _)| entry)
        .map_err(|err| truncated(err, || "compressed body header".to_owned()))
}
