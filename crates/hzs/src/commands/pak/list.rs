use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use regex::Regex;
use tracing::{info, warn};

use super::{parse_pattern, PakArgs};

#[derive(Args)]
pub struct ListArgs {
    #[command(flatten)]
    pak: PakArgs,

    /// Only list paths matching this case-insensitive regex
    #[arg(long, value_name = "REGEX", value_parser = parse_pattern)]
    pattern: Option<Regex>,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let pak = self.pak.open()?;

        let mut shown = 0usize;
        for (name, token) in pak.entries() {
            if self.pattern.as_ref().is_some_and(|p| !p.is_match(name)) {
                continue;
            }
            shown += 1;

            match pak.decode(token) {
                Ok(entry) => {
                    let method = pak
                        .info()
                        .compression_method(entry.compression_method)
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("#{}", entry.compression_method));
                    println!(
                        "{:>12} {:>6} {}",
                        entry.uncompressed_size,
                        method.dimmed(),
                        name
                    );
                }
                Err(e) => {
                    warn!("unable to decode {name}: {e}");
                    println!("{:>12} {:>6} {}", "?", "?", name.red());
                }
            }
        }

        info!("{shown} of {} files listed", pak.len());
        Ok(())
    }
}
