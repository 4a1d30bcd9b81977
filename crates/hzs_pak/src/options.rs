//! Options for opening pak files

use bon::Builder;

use crate::{crypto::AesKey, types::DEFAULT_FOOTER_SIZE};

/// Largest on-disk size an entry may declare before it is treated as corrupt
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 100 * 1024 * 1024;

/// Options for how a pak file should be read
///
/// ```
/// use hzs_pak::PakOptions;
///
/// let options = PakOptions::builder()
///     .key("321166CACD1E2BBEAC9794AAF468DE277001D2EF8F74A8D6B3CC6EDFE87945CA".parse()?)
///     .max_entry_size(10 * 1024 * 1024)
///     .build();
/// assert_eq!(options.footer_size, 204);
/// # Ok::<(), hzs_pak::error::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Builder)]
pub struct PakOptions {
    /// The key used for the index, directory block and encrypted entries
    #[builder(default)]
    pub key: AesKey,

    /// Distance from the end of the file to the start of the footer
    #[builder(default = DEFAULT_FOOTER_SIZE)]
    pub footer_size: u64,

    /// Entries claiming this many bytes on disk or more are rejected as corrupt
    #[builder(default = DEFAULT_MAX_ENTRY_SIZE)]
    pub max_entry_size: u64,
}

impl Default for PakOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}
