pub mod pak;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle pak files
    Pak {
        #[command(subcommand)]
        command: pak::PakCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Pak { command } => command.handle(),
        }
    }
}
