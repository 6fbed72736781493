//! Command-line argument definitions, built on `clap`'s derive macros the
//! same way the reference archiver's CLI is.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Pack a directory tree into a new archive.
    #[command(alias = "c")]
    Pack {
        /// Directory to pack.
        #[arg(required = true)]
        folder: PathBuf,

        /// Path for the output archive.
        output: PathBuf,

        /// Skip folder- and file-level dedup; every file becomes a Content record.
        #[arg(long)]
        no_dedup: bool,

        /// Number of compression worker threads. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },

    /// Unpack every folder in an archive to a directory.
    #[command(alias = "x")]
    Unpack {
        /// The archive file to unpack.
        #[arg(required = true)]
        archive: PathBuf,

        /// The directory to unpack into.
        output_dir: PathBuf,
    },

    /// Append a directory tree to an existing archive as new folders.
    ///
    /// Does not re-run dedup against what is already in the archive, nor
    /// among the newly appended folders themselves -- every appended file
    /// becomes its own Content record.
    Add {
        /// The archive file to append to.
        #[arg(required = true)]
        archive: PathBuf,

        /// Directory to append.
        #[arg(required = true)]
        folder: PathBuf,

        /// Number of compression worker threads. [0 = auto-detect based on CPU cores]
        #[arg(long, default_value_t = 0)]
        workers: usize,
    },

    /// List the folders and files in an archive without extracting it.
    #[command(alias = "l")]
    List {
        /// The archive file to list.
        #[arg(required = true)]
        archive: PathBuf,
    },
}

/// Parses command-line arguments and returns the command to execute.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::parse();
    Ok(args.command)
}
