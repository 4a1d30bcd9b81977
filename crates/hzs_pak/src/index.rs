//! Primary index parsing.

use std::io::{Cursor, Read, Seek, SeekFrom};

use binrw::{binread, BinRead};
use tracing::{debug, instrument};

use crate::{
    binary::{sized_blob, FString},
    crypto::Decryptor,
    error::{FormatError, Result},
    types::{ContainerInfo, IndexDescriptor},
};

/// Decrypted primary index
///
/// Holds the mount point, the pointers to the optional secondary index blocks
/// and the encoded-entries table every file record is decoded from.
#[binread]
#[derive(Debug, Clone, PartialEq)]
#[br(little)]
pub struct PakIndex {
    /// Path prefix all entries are relative to
    pub mount_point: FString,

    /// Number of files recorded by the archive
    pub entry_count: i32,

    /// Seed used for the path hash index
    pub path_hash_seed: u64,

    #[br(temp)]
    has_path_hash_index: i32,

    /// Hash based lookup block; located but never read
    #[br(if(has_path_hash_index != 0))]
    pub path_hash_index: Option<IndexDescriptor>,

    #[br(temp)]
    has_full_directory_index: i32,

    /// Directory tree block, in container coordinates
    #[br(if(has_full_directory_index != 0))]
    pub full_directory_index: Option<IndexDescriptor>,

    /// Bit-packed entry records, addressed by byte offset
    #[br(parse_with = sized_blob)]
    pub encoded_entries: Vec<u8>,
}

impl PakIndex {
    /// Parse an index from already decrypted bytes
    pub fn parse(data: &[u8]) -> Result<PakIndex> {
        Ok(PakIndex::read(&mut Cursor::new(data))?)
    }

    /// Read, decrypt and parse the primary index described by `info`.
    #[instrument(skip_all, fields(offset = info.index_offset, size = info.index_size))]
    pub fn load<R: Read + Seek>(
        reader: &mut R,
        info: &ContainerInfo,
        container_size: u64,
        decryptor: &Decryptor,
    ) -> Result<PakIndex> {
        let raw = read_region(
            reader,
            "primary index",
            info.index_offset,
            info.index_size,
            container_size,
        )?;
        let data = decryptor.decrypt_if(info.encrypted, raw);

        let index = PakIndex::parse(&data)?;
        debug!(
            mount_point = %index.mount_point,
            entries = index.entry_count,
            encoded = index.encoded_entries.len(),
            "parsed primary index"
        );
        Ok(index)
    }
}

/// Read `length` bytes at `offset`, refusing regions that extend past the container.
pub(crate) fn read_region<R: Read + Seek>(
    reader: &mut R,
    region: &'static str,
    offset: u64,
    length: u64,
    container_size: u64,
) -> Result<Vec<u8>> {
    let in_bounds = offset
        .checked_add(length)
        .is_some_and(|end| end <= container_size);
    if !in_bounds {
        return Err(FormatError::OutOfBounds {
            region,
            offset,
            length,
            size: container_size,
        }
        .into());
    }

    reader.seek(SeekFrom::Start(offset))?;
    let mut data = vec![0u8; length as usize];
    reader.read_exact(&mut data)?;
    Ok(data)
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::Error;
    use crate::types::IndexDescriptor;

    #[rustfmt::skip]
    fn index_bytes() -> Vec<u8> {
        let mut out = vec![
            // mount point "../../../"
            0x0A, 0x00, 0x00, 0x00,
            0x2E, 0x2E, 0x2F, 0x2E, 0x2E, 0x2F, 0x2E, 0x2E, 0x2F, 0x00,
            // entry count
            0x02, 0x00, 0x00, 0x00,
            // path hash seed
            0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11,
            // path hash index present
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        out.extend([0x11; 20]);
        out.extend([
            // full directory index present
            0x01, 0x00, 0x00, 0x00,
            0x00, 0x20, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x40, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ]);
        out.extend([0x22; 20]);
        out.extend([
            // encoded entries
            0x04, 0x00, 0x00, 0x00,
            0xDE, 0xAD, 0xBE, 0xEF,
        ]);
        out
    }

    #[test]
    fn read_index() -> Result<()> {
        let index = PakIndex::parse(&index_bytes())?;

        assert_eq!(&*index.mount_point, "../../../");
        assert_eq!(index.entry_count, 2);
        assert_eq!(index.path_hash_seed, 0x1122334455667788);
        assert_eq!(
            index.path_hash_index,
            Some(IndexDescriptor {
                offset: 0x1000,
                size: 0x20,
                hash: [0x11; 20],
            })
        );
        assert_eq!(
            index.full_directory_index,
            Some(IndexDescriptor {
                offset: 0x2000,
                size: 0x40,
                hash: [0x22; 20],
            })
        );
        assert_eq!(index.encoded_entries, vec![0xDE, 0xAD, 0xBE, 0xEF]);

        Ok(())
    }

    #[test]
    fn read_index_without_secondary_blocks() -> Result<()> {
        #[rustfmt::skip]
        let input = [
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];
        let index = PakIndex::parse(&input)?;

        assert!(index.mount_point.is_empty());
        assert_eq!(index.path_hash_index, None);
        assert_eq!(index.full_directory_index, None);
        assert!(index.encoded_entries.is_empty());
        Ok(())
    }

    #[test]
    fn reject_oversized_mount_point() {
        let mut input = index_bytes();
        input[0] = 0x7F;

        let err = PakIndex::parse(&input);
        assert!(matches!(err, Err(Error::Format(FormatError::Malformed { .. }))));
    }

    #[test]
    fn reject_oversized_entry_table() {
        let mut input = index_bytes();
        let len_pos = input.len() - 8;
        input[len_pos] = 0x05;

        let err = PakIndex::parse(&input);
        assert!(matches!(err, Err(Error::Format(_))));
    }

    #[test]
    fn region_outside_container() {
        let mut reader = Cursor::new(vec![0u8; 16]);
        let err = read_region(&mut reader, "primary index", 8, 16, 16);
        assert!(matches!(
            err,
            Err(Error::Format(FormatError::OutOfBounds { .. }))
        ));
    }
}
