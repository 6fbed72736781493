//! Thin CLI dispatch for `packarc`.
//!
//! Usage:
//!   packarc pack <folder> <output> [--no-dedup] [--workers N]
//!   packarc unpack <archive> <output_dir>
//!   packarc add <archive> <folder> [--workers N]
//!   packarc list <archive>

use packarc::archive::{self, PackOptions};
use packarc::cli::{self, Commands};
use packarc::extract::{self, ListedFileKind, ListedFolder};

fn main() -> std::process::ExitCode {
    match run() {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match command {
        Commands::Pack { folder, output, no_dedup, workers } => {
            let options = PackOptions { no_dedup, workers };
            let stats = archive::pack_folder(&folder, &output, options)?;
            println!(
                "packed {} folders ({} copied), {} files ({} referenced), {} -> {} bytes",
                stats.folders_written + stats.folders_copied,
                stats.folders_copied,
                stats.files_written + stats.files_referenced,
                stats.files_referenced,
                stats.bytes_in,
                stats.bytes_out
            );
            if !stats.top_folders.is_empty() {
                println!("largest folders by uncompressed size:");
                for (folder, size) in &stats.top_folders {
                    println!("  {size:>12} bytes  {folder}");
                }
            }
        }
        Commands::Unpack { archive: archive_path, output_dir } => {
            let stats = extract::extract_archive(&archive_path, &output_dir)?;
            println!("unpacked {} folders, {} files", stats.folders_written, stats.files_written);
            for warning in &stats.warnings {
                eprintln!("warning: {}", warning);
            }
        }
        Commands::Add { archive: archive_path, folder, workers } => {
            let options = PackOptions { no_dedup: true, workers };
            let stats = archive::add_folder(&archive_path, &folder, options)?;
            println!("appended {} folders, {} files, {} bytes", stats.folders_written, stats.files_written, stats.bytes_out);
            if !stats.top_folders.is_empty() {
                println!("largest appended folders by uncompressed size:");
                for (folder, size) in &stats.top_folders {
                    println!("  {size:>12} bytes  {folder}");
                }
            }
        }
        Commands::List { archive: archive_path } => {
            let folders = extract::list_archive(&archive_path)?;
            for folder in &folders {
                match folder {
                    ListedFolder::Normal { folder, files } => {
                        println!("{folder}/");
                        for file in files {
                            match &file.kind {
                                ListedFileKind::Content { stored_len } => {
                                    println!("  {} ({} bytes stored)", file.filename, stored_len)
                                }
                                ListedFileKind::Reference { source_folder, source_filename } => {
                                    println!("  {} -> {}/{}", file.filename, source_folder, source_filename)
                                }
                            }
                        }
                    }
                    ListedFolder::Copy { folder, source_folder } => {
                        println!("{folder}/ -> copy of {source_folder}/");
                    }
                }
            }
        }
    }

    Ok(())
}
