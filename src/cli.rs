use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rip")]
#[command(author, version, about = "Rip optical discs into an organised media library")]
pub struct Cli {
    /// Path to config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rip the main feature of a movie disc into a category folder
    Dvd {
        /// Physical device path (defaults to drive.default_device)
        #[arg(short, long)]
        device: Option<PathBuf>,

        /// Target category folder (e.g. Comedy, Action)
        #[arg(short, long)]
        category: Option<String>,

        /// Movie name; overrides the positional query
        #[arg(short, long)]
        movie: Option<String>,

        /// Movie name to look up; the disc label is used when omitted
        query: Option<String>,
    },

    /// Rip every episode on a TV disc
    Tv {
        /// Show name to look up
        query: String,

        /// Season and disc, e.g. "1-2" for season 1, disc 2
        season_disc: String,

        /// Physical device path (defaults to drive.default_device)
        #[arg(short, long)]
        device: Option<PathBuf>,
    },

    /// Start the web server and background job runner
    Web {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Library storage root
        #[arg(long)]
        storage: Option<PathBuf>,
    },

    /// Check that the external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
