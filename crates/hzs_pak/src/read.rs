//! Types for reading pak archives
//!

use binrw::BinRead;
use indexmap::IndexMap;
use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
    sync::Arc,
};
use tracing::{debug, instrument, warn};

use crate::{
    compression::{inflate_block, CompressionMethod},
    crypto::Decryptor,
    directory::{DirectoryListing, ListingStatus},
    entry::{read_body_header, DecodedEntry, PakEntry},
    error::{Error, FileNotFoundError, FormatError, Result},
    index::{read_region, PakIndex},
    options::PakOptions,
    types::ContainerInfo,
};

/// Handle to one file of the archive
///
/// Tokens are only meaningful for the archive that handed them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryToken {
    encoded_offset: u32,
}

impl EntryToken {
    /// Offset of the file's record in the encoded-entries table
    pub fn encoded_offset(&self) -> u32 {
        self.encoded_offset
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    info: ContainerInfo,
    index: PakIndex,
    status: ListingStatus,
    expected: u64,
    files: IndexMap<Box<str>, EntryToken>,
    container_size: u64,
    options: PakOptions,
    decryptor: Decryptor,
}

/// Pak archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_pak_contents(reader: impl Read + Seek) -> hzs_pak::error::Result<()> {
///     let mut pak = hzs_pak::PakArchive::new(reader, hzs_pak::PakOptions::default())?;
///
///     for i in 0..pak.len() {
///         let data = pak.by_index(i)?;
///         println!("{}: {} bytes", pak.name_for_index(i).unwrap_or_default(), data.len());
///     }
///
///     Ok(())
/// }
/// ```
pub struct PakArchive<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl PakArchive<File> {
    /// Open the pak file at `path`.
    pub fn open(path: impl AsRef<Path>, options: PakOptions) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(file, options)
    }
}

impl<R> PakArchive<R> {
    /// Number of files listed by the directory index.
    pub fn len(&self) -> usize {
        self.shared.files.len()
    }

    /// Whether the directory index lists no files
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of files the primary index says the archive holds
    pub fn expected_len(&self) -> u64 {
        self.shared.expected
    }

    /// How completely the directory index was decoded
    pub fn listing_status(&self) -> &ListingStatus {
        &self.shared.status
    }

    /// The parsed footer
    pub fn info(&self) -> &ContainerInfo {
        &self.shared.info
    }

    /// The decrypted primary index
    pub fn index(&self) -> &PakIndex {
        &self.shared.index
    }

    /// Path prefix of every entry
    pub fn mount_point(&self) -> &str {
        &self.shared.index.mount_point
    }

    /// Length of the underlying container in bytes
    pub fn container_size(&self) -> u64 {
        self.shared.container_size
    }

    /// Returns an iterator over all the file names in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.files.keys().map(|s| s.as_ref())
    }

    /// Returns every file name with the token used to extract it, in index order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, EntryToken)> {
        self.shared.files.iter().map(|(name, token)| (name.as_ref(), *token))
    }

    /// Get the index of a file entry by name, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared.files.get_index_of(name)
    }

    /// Get the name of a file entry, if it's present.
    #[inline(always)]
    pub fn name_for_index(&self, index: usize) -> Option<&str> {
        self.shared
            .files
            .get_index(index)
            .map(|(name, _)| name.as_ref())
    }

    /// Get the token of a file entry by name, if it's present.
    pub fn token_for_name(&self, name: &str) -> Option<EntryToken> {
        self.shared.files.get(name).copied()
    }

    /// Decode the record behind `token`.
    pub fn decode(&self, token: EntryToken) -> Result<DecodedEntry> {
        DecodedEntry::decode(
            &self.shared.index.encoded_entries,
            token.encoded_offset as usize,
        )
        .map(|(entry, _)| entry)
    }

    /// Total size of the files in the archive once extracted, if every record
    /// can be decoded.
    pub fn decompressed_size(&self) -> Option<u128> {
        let mut total = 0u128;
        for (_, token) in self.entries() {
            let entry = self.decode(token).ok()?;
            total = total.checked_add(entry.uncompressed_size as u128)?;
        }
        Some(total)
    }

    /// Share the parsed metadata with another reader over the same container.
    ///
    /// Each handle positions its own reader, so files can be extracted from
    /// several handles at once.
    pub fn with_reader<S>(&self, reader: S) -> PakArchive<S> {
        PakArchive {
            reader,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> PakArchive<R> {
    /// Read a pak archive, decrypting its index and collecting the files it lists.
    pub fn new(mut reader: R, options: PakOptions) -> Result<PakArchive<R>> {
        let shared = Self::get_metadata(&mut reader, options)?;
        Ok(PakArchive {
            reader,
            shared: shared.into(),
        })
    }

    /// Extract a file by name
    pub fn by_name(&mut self, name: &str) -> Result<Vec<u8>> {
        let Some(token) = self.token_for_name(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.extract(token)
    }

    /// Extract a file by index
    pub fn by_index(&mut self, file_number: usize) -> Result<Vec<u8>> {
        let token = self
            .shared
            .files
            .get_index(file_number)
            .map(|(_, token)| *token)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file_number)))?;
        self.extract(token)
    }

    /// Extract the contents of the file behind `token`.
    ///
    /// The entry is checked before anything is read: an undecodable record, a
    /// body outside the container or an implausible size fails with
    /// [`Error::CorruptEntry`]. Compressed entries other than zlib fail with
    /// [`Error::UnsupportedCompression`].
    #[instrument(skip(self), err)]
    pub fn extract(&mut self, token: EntryToken) -> Result<Vec<u8>> {
        let entry = self
            .decode(token)
            .map_err(|err| match err {
                Error::Format(e) => Error::corrupt(
                    u64::from(token.encoded_offset),
                    format!("undecodable record: {e}"),
                ),
                other => other,
            })?
            .into_view();
        entry.validate(self.shared.container_size, self.shared.options.max_entry_size)?;

        if entry.is_stored() {
            return self.read_stored(&entry);
        }

        let method = self
            .shared
            .info
            .compression_method(entry.compression_method)
            .unwrap_or_else(|| CompressionMethod::Other(format!("#{}", entry.compression_method)));
        if method != CompressionMethod::Zlib {
            return Err(Error::UnsupportedCompression {
                index: entry.compression_method,
                name: method.name().to_owned(),
            });
        }

        self.read_compressed(&entry)
    }

    fn read_stored(&mut self, entry: &PakEntry) -> Result<Vec<u8>> {
        let data = read_region(
            &mut self.reader,
            "entry body",
            entry.offset,
            entry.size,
            self.shared.container_size,
        )?;
        debug!(offset = entry.offset, size = entry.size, encrypted = entry.encrypted, "read stored entry");
        Ok(self.shared.decryptor.decrypt_if(entry.encrypted, data))
    }

    fn read_compressed(&mut self, entry: &PakEntry) -> Result<Vec<u8>> {
        self.reader.seek(SeekFrom::Start(entry.offset))?;
        let header = read_body_header(&mut self.reader, entry.blocks.len() as u32).map_err(
            |err| match err {
                Error::Format(e) => {
                    Error::corrupt(entry.offset, format!("unreadable body header: {e}"))
                }
                other => other,
            },
        )?;
        let blocks = &header.blocks;

        let container_size = self.shared.container_size;
        let capacity = entry.uncompressed_size.min(self.shared.options.max_entry_size);
        let mut out = Vec::with_capacity(capacity as usize);

        for block in blocks {
            let start = entry.offset.checked_add(block.start);
            let end = entry.offset.checked_add(block.end);
            let (Some(start), Some(end)) = (start, end) else {
                return Err(Error::corrupt(entry.offset, "block range overflows"));
            };
            if block.end < block.start || end > container_size {
                return Err(Error::corrupt(
                    entry.offset,
                    format!("block {:#x}..{:#x} outside the container", block.start, block.end),
                ));
            }

            let raw = read_region(
                &mut self.reader,
                "compression block",
                start,
                end - start,
                container_size,
            )?;
            let raw = self.shared.decryptor.decrypt_if(header.encrypted, raw);

            let remaining = entry.uncompressed_size - out.len() as u64;
            inflate_block(&raw, remaining, &mut out)
                .map_err(|e| Error::corrupt(entry.offset, format!("failed to inflate block: {e}")))?;
        }

        if out.len() as u64 != entry.uncompressed_size {
            return Err(Error::corrupt(
                entry.offset,
                format!(
                    "inflated {} bytes, expected {}",
                    out.len(),
                    entry.uncompressed_size
                ),
            ));
        }

        debug!(
            offset = entry.offset,
            blocks = blocks.len(),
            size = out.len(),
            "inflated compressed entry"
        );
        Ok(out)
    }

    fn get_metadata(reader: &mut R, options: PakOptions) -> Result<Shared> {
        let container_size = reader.seek(SeekFrom::End(0))?;
        if container_size < options.footer_size {
            return Err(FormatError::TooSmall {
                size: container_size,
                footer: options.footer_size,
            }
            .into());
        }

        reader.seek(SeekFrom::Start(container_size - options.footer_size))?;
        let info = ContainerInfo::read_args(reader, (options.footer_size,))?;
        debug!(
            version = info.version,
            encrypted = info.encrypted,
            methods = info.compression_methods.len(),
            "read pak footer"
        );

        let decryptor = Decryptor::new(&options.key);
        let index = PakIndex::load(reader, &info, container_size, &decryptor)?;
        let DirectoryListing {
            entries,
            expected,
            status,
        } = DirectoryListing::load(reader, &info, &index, container_size, &decryptor)?;

        let mut files = IndexMap::with_capacity(entries.len());
        for entry in entries {
            let token = EntryToken {
                encoded_offset: entry.encoded_offset,
            };
            if let Some(previous) = files.insert(entry.path.clone(), token) {
                warn!(
                    path = %entry.path,
                    previous = previous.encoded_offset,
                    current = token.encoded_offset,
                    "directory index lists a path twice, keeping the later record"
                );
            }
        }

        Ok(Shared {
            info,
            index,
            status,
            expected,
            files,
            container_size,
            options,
            decryptor,
        })
    }
}
