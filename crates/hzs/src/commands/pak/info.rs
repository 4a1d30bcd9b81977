use clap::Args;
use hzs_pak::ListingStatus;
use itertools::Itertools;
use miette::Result;
use owo_colors::OwoColorize;

use super::PakArgs;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pak: PakArgs,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let pak = self.pak.open()?;
        let info = pak.info();

        let methods = if info.compression_methods.is_empty() {
            "none listed".to_owned()
        } else {
            info.compression_methods
                .iter()
                .enumerate()
                .map(|(i, name)| format!("{}={}", i + 1, name.0))
                .join(", ")
        };

        let listing = match pak.listing_status() {
            ListingStatus::Complete => "complete".green().to_string(),
            ListingStatus::Partial { reason } => format!("{} ({reason})", "partial".yellow()),
            ListingStatus::Unavailable => "unavailable".red().to_string(),
        };

        println!("{}", self.pak.pak.display().bold());
        println!("  {:<20} {} bytes", "container size".cyan(), pak.container_size());
        println!("  {:<20} {}", "version".cyan(), info.version);
        println!("  {:<20} {:#x}", "index offset".cyan(), info.index_offset);
        println!("  {:<20} {} bytes", "index size".cyan(), info.index_size);
        println!("  {:<20} {}", "encrypted".cyan(), info.encrypted);
        println!("  {:<20} {}", "compression".cyan(), methods);
        println!("  {:<20} {}", "mount point".cyan(), pak.mount_point());
        println!("  {:<20} {}", "entries".cyan(), pak.expected_len());
        println!("  {:<20} {} ({listing})", "listed".cyan(), pak.len());
        println!(
            "  {:<20} {} bytes",
            "encoded entries".cyan(),
            pak.index().encoded_entries.len()
        );
        if let Some(total) = pak.decompressed_size() {
            println!("  {:<20} {} bytes", "extracted size".cyan(), total);
        }

        Ok(())
    }
}
