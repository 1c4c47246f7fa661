//! reelvault CLI
//!
//! Command-line interface for managing and serving a reelvault repository.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod error;

#[derive(Parser)]
#[command(name = "reelvault")]
#[command(about = "Content-addressed media catalog with a web interface", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the catalog over HTTP
    Serve {
        /// Path to a reelvault repository
        repository: PathBuf,

        /// Port to listen on
        #[arg(short, long, default_value_t = 8000)]
        port: u16,

        /// Seconds a connection may stay idle before it is closed
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },

    /// Import a file or folder into the repository
    Import {
        /// Path to a reelvault repository
        repository: PathBuf,

        /// File or folder to import
        path: PathBuf,
    },

    /// Check repository integrity (re-hashes every stored file; slow)
    Check {
        /// Path to a reelvault repository
        repository: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve {
            repository,
            port,
            timeout_secs,
        } => commands::serve::run(&repository, port, timeout_secs),
        Commands::Import { repository, path } => commands::import::run(&repository, &path),
        Commands::Check { repository } => commands::check::run(&repository),
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err}");
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
