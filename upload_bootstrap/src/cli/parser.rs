//! # CLI Parser
//!
//! Command-line interface parsing using clap.
//!
//! This module defines the CLI structure and handles argument parsing.
//! Security validation happens in the validator module after parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Main CLI structure, shared by the `upload-cli` client and the
/// `upload-server` binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "upload")]
#[command(about = concat!("Chunked upload platform v", env!("CARGO_PKG_VERSION")))]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override upload concurrency (number of chunks in flight at once)
    #[arg(long)]
    pub concurrency: Option<usize>,
}

/// CLI subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Upload a file, creating a new task
    Upload {
        /// File to upload
        #[arg(short, long)]
        input: PathBuf,

        /// Upload server base URL
        #[arg(short, long)]
        server: String,

        /// Preferred chunk size in MB, subject to server negotiation
        #[arg(long)]
        chunk_size_mb: Option<usize>,

        /// Path to the progress store database (default: platform data dir)
        #[arg(long)]
        progress_db: Option<PathBuf>,
    },

    /// Resume a previously interrupted upload task
    Resume {
        /// Task id to resume
        task_id: String,

        /// File to resume uploading (must match the original file's name/size/type)
        #[arg(short, long)]
        input: PathBuf,

        /// Upload server base URL
        #[arg(short, long)]
        server: String,

        /// Path to the progress store database
        #[arg(long)]
        progress_db: Option<PathBuf>,
    },

    /// List tracked upload tasks
    ListTasks {
        /// Path to the progress store database
        #[arg(long)]
        progress_db: Option<PathBuf>,
    },

    /// Cancel a tracked upload task
    Cancel {
        /// Task id to cancel
        task_id: String,

        /// Path to the progress store database
        #[arg(long)]
        progress_db: Option<PathBuf>,
    },

    /// Run the upload server
    Serve {
        /// Address to bind the HTTP server to
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,

        /// Directory to store content-addressed chunk objects in
        #[arg(long)]
        data_dir: PathBuf,

        /// Database connection string for manifest/token metadata
        #[arg(long)]
        database_url: Option<String>,
    },
}

/// Parse CLI arguments
///
/// # Panics
///
/// Clap exits the process with a usage message if parsing fails, or for
/// `--help`/`--version`.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_upload_command() {
        let cli = Cli::parse_from([
            "upload",
            "upload",
            "--input",
            "file.bin",
            "--server",
            "https://example.com",
        ]);

        match cli.command {
            Commands::Upload { input, server, .. } => {
                assert_eq!(input, PathBuf::from("file.bin"));
                assert_eq!(server, "https://example.com");
            }
            _ => panic!("expected Upload command"),
        }
    }

    #[test]
    fn parses_serve_command() {
        let cli = Cli::parse_from(["upload", "serve", "--data-dir", "/data"]);

        match cli.command {
            Commands::Serve { bind, data_dir, .. } => {
                assert_eq!(bind, "0.0.0.0:8080");
                assert_eq!(data_dir, PathBuf::from("/data"));
            }
            _ => panic!("expected Serve command"),
        }
    }
}
