use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use regex::Regex;
use std::{
    fs::File,
    io::Write,
    path::{Component, Path, PathBuf},
};
use tracing::{info, warn};

use super::{parse_pattern, PakArgs};

#[derive(Args)]
pub struct ExtractArgs {
    #[command(flatten)]
    pak: PakArgs,

    /// Only extract paths matching this case-insensitive regex
    #[arg(long, value_name = "REGEX", value_parser = parse_pattern)]
    pattern: Option<Regex>,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Write every file directly into the target directory
    #[arg(long, default_value_t = false)]
    flatten: bool,

    /// Allow overwriting existing files
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

/// Relative path below the target directory, without any root or `..` parts.
fn target_path(name: &str, flatten: bool) -> Option<PathBuf> {
    let path = Path::new(name);
    if flatten {
        return path.file_name().map(PathBuf::from);
    }

    let relative = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect::<PathBuf>();
    (!relative.as_os_str().is_empty()).then_some(relative)
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let mut pak = self.pak.open()?;

        let selected = pak
            .entries()
            .filter(|(name, _)| self.pattern.as_ref().map_or(true, |p| p.is_match(name)))
            .map(|(name, token)| (name.to_owned(), token))
            .collect::<Vec<_>>();

        let mut extracted = 0usize;
        for (name, token) in &selected {
            let Some(relative) = target_path(name, self.flatten) else {
                warn!("skipping {name}: no usable file name");
                continue;
            };

            let data = match pak.extract(*token) {
                Ok(data) => data,
                Err(e) if e.is_recoverable() => {
                    warn!("skipping {name}: {e}");
                    continue;
                }
                Err(e) => return Err(e).context(format!("extracting {name}")),
            };

            let p = self.directory.join(relative);
            info!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .into_diagnostic()
                    .context(format!("creating {}", parent.display()))?;
            }
            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            out.write_all(&data).into_diagnostic()?;
            extracted += 1;
        }

        info!("extracted {extracted}/{}", selected.len());
        Ok(())
    }
}
