use clap::Subcommand;
use std::path::PathBuf;

pub mod export;
pub mod import;

#[derive(Subcommand)]
pub enum Commands {
    /// Export a .translation file's messages to CSV
    Export {
        /// The .translation file, or its member name inside a PCK
        file: String,

        /// Extract the file from this PCK archive first
        #[arg(long)]
        pck: Option<PathBuf>,

        /// Output CSV path (defaults to "<file>.csv")
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply a translated CSV back onto its .translation file
    Import {
        /// A CSV produced by export, named "<member>.csv"
        file: PathBuf,

        /// Patch the member inside this PCK archive
        #[arg(long)]
        pck: Option<PathBuf>,

        /// Locale code stored in the patched resource
        #[arg(long, default_value = "en")]
        locale: String,
    },
}

impl Commands {
    pub fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Export { file, pck, output } => {
                export::run(&file, pck.as_deref(), output.as_deref())
            }
            Commands::Import { file, pck, locale } => import::run(&file, pck.as_deref(), &locale),
        }
    }
}
