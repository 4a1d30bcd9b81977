//! This library handles reading the encrypted **pak** archives shipped with *HumanitZ*.
//!
//! # Pak Archive Format Documentation
//!
//! The game stores its assets in Unreal style pak files (index version 11). A
//! pak file consists of the file bodies, an encrypted primary index, an
//! encrypted directory index and a fixed size footer at the very end.
//!
//! ## File Structure
//!
//! ### Footer
//!
//! The footer starts 204 bytes before the end of the file.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x5A6F12E1                                        |
//! | 0x0004         | Version                | 4 bytes: Format version, 11 for the supported layout       |
//! | 0x0008         | Index Offset           | 8 bytes: Offset to the primary index                       |
//! | 0x0010         | Index Size             | 8 bytes: Size of the primary index                         |
//! | 0x0018         | Index Hash             | 20 bytes: SHA-1 of the primary index                       |
//! | 0x002C         | Encrypted              | 1 byte: Whether the index blocks are encrypted             |
//! | 0x002D         | Key GUID               | 16 bytes: Identifies the encryption key                    |
//! | 0x003D         | Method Count           | 4 bytes: Number of compression method names that follow    |
//! | 0x0041         | Method Names           | 32 bytes each: NUL padded ASCII names                      |
//!
//! Entries refer to compression methods by index. Index `0` is stored data,
//! index `n` is the `n`th name of the footer.
//!
//! ### Primary Index
//!
//! Located at **Index Offset**. When the footer's **Encrypted** flag is set the
//! block is encrypted with AES-256 in ECB mode. Once decrypted it holds:
//!
//! - **Mount Point**: A string every path is relative to.
//! - **Entry Count**: A 4-byte signed integer with the number of files.
//! - **Path Hash Seed**: 8 bytes, only used by the path hash index.
//! - **Path Hash Index**: A 4-byte presence flag, followed when set by an
//!   8-byte offset, an 8-byte size and a 20-byte hash.
//! - **Full Directory Index**: The same shape as the path hash index. The offset
//!   points into the pak file itself, not into the primary index.
//! - **Encoded Entries**: A 4-byte size followed by the table of bit-packed
//!   entry records, see [`entry`].
//!
//! Strings are stored with a 4-byte signed length `L` in front. A positive `L`
//! is followed by `L` single-byte characters, a negative `L` by `-L` UTF-16
//! code units. Both end with a NUL.
//!
//! ### Directory Index
//!
//! A separately encrypted block listing every directory, and for each directory
//! its files together with the byte offset of their record in the encoded
//! entries.
//!
//! | Field            | Description                                            |
//! |------------------|--------------------------------------------------------|
//! | Directory Count  | 4 bytes                                                |
//! | Directory Name   | String                                                 |
//! | File Count       | 4 bytes                                                |
//! | File Name        | String                                                 |
//! | Record Offset    | 4 bytes: Offset into the encoded entries               |
//!
//! ### File Bodies
//!
//! Stored bodies are the raw file, possibly encrypted. Compressed bodies start
//! with their own full entry header followed by independently compressed
//! blocks, whose ranges are relative to the start of the body.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.pak`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Compression Methods**: stored data and zlib can be extracted
//!

pub mod binary;
pub mod compression;
pub mod crypto;
pub mod directory;
pub mod entry;
pub mod error;
pub mod index;
pub mod options;
pub mod read;
pub mod types;

pub use compression::CompressionMethod;
pub use crypto::AesKey;
pub use directory::{DirectoryEntry, ListingStatus};
pub use entry::{DecodedEntry, PakEntry};
pub use options::PakOptions;
pub use read::{EntryToken, PakArchive};
