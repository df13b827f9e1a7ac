use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "doramp3")]
#[command(author, version, about = "Fetch a video's audio track and serve it as MP3", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP service (default)
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for produced MP3 files (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Run one download from the terminal and print the JSON result
    Fetch {
        /// Video URL
        url: String,

        /// Directory for the produced MP3 file (overrides OUTPUT_DIR)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
