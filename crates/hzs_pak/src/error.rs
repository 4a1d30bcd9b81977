//! Error types that can be emitted from this library

use std::io::ErrorKind;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// the container structure could not be decoded
    #[error("invalid pak archive")]
    #[diagnostic(code(hzs_pak::format))]
    Format(#[from] FormatError),

    /// entry uses a compression method this library cannot inflate
    #[error("unsupported compression method {index} ({name})")]
    #[diagnostic(
        code(hzs_pak::unsupported_compression),
        help("only stored and zlib entries can be extracted")
    )]
    UnsupportedCompression {
        /// Method index stored in the entry
        index: u32,
        /// Name resolved through the footer, if any
        name: String,
    },

    /// entry failed its offset/size sanity checks
    #[error("corrupt entry at offset {offset:#x}: {reason}")]
    #[diagnostic(code(hzs_pak::corrupt_entry))]
    CorruptEntry {
        /// Body offset recorded for the entry, or the record's offset in the
        /// encoded-entries table when the record itself cannot be decoded
        offset: u64,
        /// Which check failed
        reason: String,
    },

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

impl Error {
    /// Whether the error only concerns a single entry, so that a caller can
    /// skip it and carry on with the rest of the archive.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedCompression { .. }
                | Error::CorruptEntry { .. }
                | Error::FileNotFound(_)
        )
    }

    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Error::CorruptEntry {
            offset,
            reason: reason.into(),
        }
    }
}

/// Structural problems found while decoding the footer, index or tables
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// footer magic did not match
    #[error("bad magic {found} at {pos:#x}")]
    InvalidMagic {
        /// Position of the magic in the stream
        pos: u64,
        /// Debug rendering of the value found
        found: String,
    },

    /// container is smaller than the footer
    #[error("container of {size} bytes cannot hold a {footer} byte footer")]
    TooSmall {
        /// Container length
        size: u64,
        /// Expected footer length
        footer: u64,
    },

    /// a region described by the metadata lies outside the container
    #[error("{region} at {offset:#x}+{length:#x} lies outside the {size} byte container")]
    OutOfBounds {
        /// Which region was being located
        region: &'static str,
        /// Region start
        offset: u64,
        /// Region length
        length: u64,
        /// Container length
        size: u64,
    },

    /// a structural read ran past the end of its buffer
    #[error("unexpected end of data while reading {0}")]
    Truncated(String),

    /// a structural value was out of range
    #[error("malformed data at {pos:#x}: {message}")]
    Malformed {
        /// Position of the offending value
        pos: u64,
        /// What was wrong with it
        message: String,
    },
}

impl From<binrw::Error> for Error {
    fn from(value: binrw::Error) -> Self {
        match value {
            binrw::Error::BadMagic { pos, found } => Error::Format(FormatError::InvalidMagic {
                pos,
                found: format!("{found:?}"),
            }),
            binrw::Error::AssertFail { pos, message } => {
                Error::Format(FormatError::Malformed { pos, message })
            }
            binrw::Error::Io(err) if err.kind() == ErrorKind::UnexpectedEof => {
                Error::Format(FormatError::Truncated(err.to_string()))
            }
            binrw::Error::Io(err) => Error::IOError(err),
            binrw::Error::Backtrace(bt) => Error::from(*bt.error),
            other => Error::Format(FormatError::Malformed {
                pos: 0,
                message: other.to_string(),
            }),
        }
    }
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
