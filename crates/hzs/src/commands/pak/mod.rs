use std::path::PathBuf;

use clap::Args;
use hzs_pak::{options::DEFAULT_MAX_ENTRY_SIZE, AesKey, PakArchive, PakOptions};
use miette::{Context, Result};
use regex::{Regex, RegexBuilder};

pub mod extract;
pub mod info;
pub mod list;

#[derive(clap::Subcommand)]
pub enum PakCommands {
    /// Summarize the footer and index of a pak file
    Info(info::InfoArgs),
    /// List the files of a pak file
    List(list::ListArgs),
    /// Extract files from a pak file into a directory
    Extract(extract::ExtractArgs),
}

impl PakCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            PakCommands::Info(info) => info.handle(),
            PakCommands::List(list) => list.handle(),
            PakCommands::Extract(extract) => extract.handle(),
        }
    }
}

/// Arguments shared by every pak command
#[derive(Args)]
pub struct PakArgs {
    /// An input pak file
    #[arg(short, long, value_name = "FILE")]
    pak: PathBuf,

    /// AES-256 key as 64 hex characters, defaults to the game key
    #[arg(short, long, value_name = "HEX", env = "HZS_AES_KEY", hide_env_values = true)]
    key: Option<AesKey>,

    /// Entries this large on disk are treated as corrupt
    #[arg(long, value_name = "BYTES", default_value_t = DEFAULT_MAX_ENTRY_SIZE)]
    max_entry_size: u64,
}

impl PakArgs {
    pub fn options(&self) -> PakOptions {
        PakOptions::builder()
            .key(self.key.unwrap_or_default())
            .max_entry_size(self.max_entry_size)
            .build()
    }

    pub fn open(&self) -> Result<PakArchive<std::fs::File>> {
        PakArchive::open(&self.pak, self.options())
            .context(format!("path: {}", self.pak.display()))
    }
}

/// Case-insensitive pattern for entry paths
pub(crate) fn parse_pattern(pattern: &str) -> std::result::Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}
