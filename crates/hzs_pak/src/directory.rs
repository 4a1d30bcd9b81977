//! Directory tree decoding.
//!
//! The full directory index is a separate encrypted block holding, for each
//! directory, the names of its files and where their records live in the
//! encoded-entries table.

use std::io::{Cursor, Read, Seek};

use binrw::BinRead;
use tracing::{debug, instrument, warn};

use crate::{
    binary::FString,
    crypto::Decryptor,
    error::{Error, Result},
    index::{read_region, PakIndex},
    types::ContainerInfo,
};

/// A file listed by the directory index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Directory name followed by file name
    pub path: Box<str>,

    /// Byte offset of the file's record inside the encoded-entries table
    pub encoded_offset: u32,
}

/// How completely the directory index could be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingStatus {
    /// Every directory and file was decoded
    Complete,

    /// Decoding stopped early; the entries before the failure are kept
    Partial {
        /// Why decoding stopped
        reason: String,
    },

    /// The archive carries no directory index, so its files cannot be enumerated
    Unavailable,
}

/// Flat file list produced from the directory index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Files in the order they appear in the index
    pub entries: Vec<DirectoryEntry>,

    /// Number of files the primary index says the archive holds
    pub expected: u64,

    /// Whether the listing is complete
    pub status: ListingStatus,
}

impl DirectoryListing {
    fn unavailable(expected: u64) -> Self {
        Self {
            entries: Vec::new(),
            expected,
            status: ListingStatus::Unavailable,
        }
    }

    /// Number of files that were decoded
    pub fn found(&self) -> u64 {
        self.entries.len() as u64
    }

    /// Whether decoding ran to the end of the directory index
    pub fn is_complete(&self) -> bool {
        self.status == ListingStatus::Complete
    }

    /// Decode an already decrypted directory block.
    ///
    /// A structural failure part way through does not discard the files read
    /// so far; they are returned with a [`ListingStatus::Partial`] status.
    pub fn parse(data: &[u8], expected: u64) -> Self {
        let mut entries = Vec::new();
        let status = match read_tree(&mut Cursor::new(data), &mut entries) {
            Ok(()) => ListingStatus::Complete,
            Err(err) => {
                warn!(
                    found = entries.len(),
                    expected, "directory index parsing stopped: {err}"
                );
                ListingStatus::Partial {
                    reason: err.to_string(),
                }
            }
        };

        Self {
            entries,
            expected,
            status,
        }
    }

    /// Locate, decrypt and decode the directory block referenced by `index`.
    #[instrument(skip_all)]
    pub fn load<R: Read + Seek>(
        reader: &mut R,
        info: &ContainerInfo,
        index: &PakIndex,
        container_size: u64,
        decryptor: &Decryptor,
    ) -> Result<Self> {
        let expected = u64::try_from(index.entry_count).unwrap_or_default();

        let Some(descriptor) = index
            .full_directory_index
            .filter(|d| d.offset > 0 && d.size > 0)
        else {
            debug!("archive has no directory index");
            return Ok(Self::unavailable(expected));
        };

        let raw = read_region(
            reader,
            "directory index",
            descriptor.offset as u64,
            descriptor.size as u64,
            container_size,
        )?;
        let data = decryptor.decrypt_if(info.encrypted, raw);

        let listing = Self::parse(&data, expected);
        debug!(found = listing.found(), expected, "parsed directory index");
        Ok(listing)
    }
}

fn read_tree(reader: &mut Cursor<&[u8]>, entries: &mut Vec<DirectoryEntry>) -> Result<()> {
    let directories = i32::read_le(reader)?;
    for _ in 0..directories {
        let directory = FString::read_le(reader)?;
        let files = i32::read_le(reader)?;

        for _ in 0..files {
            let file = FString::read_le(reader)?;
            let encoded_offset = i32::read_le(reader)?;
            let encoded_offset = u32::try_from(encoded_offset).map_err(|_| {
                Error::CustomError(format!(
                    "negative record offset {encoded_offset} for {directory}{file}"
                ))
            })?;

            entries.push(DirectoryEntry {
                path: format!("{directory}{file}").into(),
                encoded_offset,
            });
        }
    }
    Ok(())
}
