//! `image-encryptor` — command-line entry point.
//!
//! Startup sequence:
//! 1. Parse the command line.
//! 2. Load and validate [`config::Config`] from environment variables.
//! 3. Initialise structured JSON logging.
//! 4. Seal or open every named file, printing one JSON result line per file.

mod config;
mod export;
mod runner;
mod telemetry;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use runner::{Mode, RunSettings};

#[derive(Parser, Debug)]
#[command(
    name = "image-encryptor",
    version,
    about = "Encrypt images into self-contained AES-256-GCM containers",
    long_about = "Encrypt images into self-contained AES-256-GCM containers.\n\n\
                  Each container stores its key next to the ciphertext: it is a \
                  demo format and is not secure for transport."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Seal image files into `<name>.encrypted` containers
    Encrypt {
        /// Files to encrypt
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory for the containers (default: next to each input)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },

    /// Open `.encrypted` containers and write the plaintext back out
    Decrypt {
        /// Containers to open
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Directory for the restored files (default: next to each container)
        #[arg(long, short = 'o')]
        out_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = config::Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: image-encryptor configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        nonce_len = cfg.nonce_length.byte_len(),
        encoding = %cfg.encoding,
        "image-encryptor starting"
    );

    // -----------------------------------------------------------------------
    // 4. Jobs
    // -----------------------------------------------------------------------
    let (mode, files, out_dir) = match cli.command {
        Command::Encrypt { files, out_dir } => (Mode::Encrypt, files, out_dir),
        Command::Decrypt { files, out_dir } => (Mode::Decrypt, files, out_dir),
    };
    let settings = RunSettings {
        mode,
        out_dir,
        options: cfg.envelope_options(),
        accept_any_type: cfg.accept_any_type,
        max_concurrency: cfg.max_concurrency,
    };

    let total = files.len();
    let outcomes = runner::run(files, settings).await;
    let mut failed = 0usize;
    for outcome in &outcomes {
        let line = match outcome {
            Ok(summary) => serde_json::to_string(summary)?,
            Err(report) => {
                failed += 1;
                serde_json::to_string(report)?
            }
        };
        println!("{line}");
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {total} files failed");
    }
    Ok(())
}
