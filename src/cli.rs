use clap::{Parser, Subcommand};
use reelhouse::config::{ByteSize, MountArg};
use reelhouse_media::ResourceMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "reelhouse")]
#[command(author, version, about = "Stream a home video library to TVs and players over HTTP")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming server
    Serve {
        /// Media root directories, mounted together as one volume
        paths: Vec<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Resource mode: direct or buffered
        #[arg(long)]
        mode: Option<ResourceMode>,

        /// Read buffer size (e.g. 10MB, 512KB)
        #[arg(long)]
        buffer_size: Option<ByteSize>,

        /// Max concurrent disk reads for the positional paths
        #[arg(long)]
        max_io: Option<usize>,

        /// Mount a volume: ID:LIMIT:PATH1,PATH2,...
        #[arg(long = "mount", value_name = "ID:LIMIT:PATHS")]
        mounts: Vec<MountArg>,
    },

    /// Scan media roots once and print the catalog
    Scan {
        /// Media root directories (uses configured volumes if not specified)
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
