//! getme CLI - fetch build artifacts through a local cache.

mod commands;
mod error;

use std::process;

use clap::{Parser, Subcommand};
use getme::fallback::BuildRequest;
use tracing_subscriber::EnvFilter;

use commands::{copy, download, extract, pinata, GlobalArgs};
use error::CliError;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "GETME_LOG";

#[derive(Debug, Parser)]
#[command(name = "getme")]
#[command(version, about = "Fetch build artifacts through a local cache")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Download an artifact and print its local path
    Download {
        /// Artifact URL (http, https, s3 or GitHub release asset)
        url: String,
    },

    /// Copy an artifact to a destination ("-" for stdout)
    Copy { url: String, destination: String },

    /// Extract an archive: `<url> <dir>` or `<url> <src> <dest> [<src> <dest>...]`
    #[command(visible_aliases = ["unzip", "unzip-single-file"])]
    Extract {
        url: String,
        #[arg(required = true, num_args = 1..)]
        targets: Vec<String>,
    },

    /// Fetch a Docker ISO, triggering a CI build when it is missing
    Pinata {
        /// CI server base URL
        ci_url: String,
        user: String,
        token: String,
        bucket: String,
        commit: String,
        platform: String,

        /// Give up waiting for the build to leave the queue (seconds)
        #[arg(long)]
        queue_timeout: Option<u64>,

        /// Give up waiting for the build to finish (seconds)
        #[arg(long)]
        build_timeout: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        process::exit(1);
    }
}

/// Log to stderr; stdout carries command output only.
fn init_logging(cli: &Cli) {
    let filter = if cli.global.verbose {
        EnvFilter::new("debug")
    } else {
        let default = match cli.command {
            Commands::Download { .. } => "warn",
            _ => "info",
        };
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        Commands::Download { url } => download::run(&global, &url),
        Commands::Copy { url, destination } => copy::run(&global, &url, &destination),
        Commands::Extract { url, targets } => extract::run(&global, &url, &targets),
        Commands::Pinata {
            ci_url,
            user,
            token,
            bucket,
            commit,
            platform,
            queue_timeout,
            build_timeout,
        } => pinata::run(
            &global,
            pinata::PinataArgs {
                request: BuildRequest {
                    ci_base_url: ci_url,
                    user,
                    token,
                    bucket,
                    commit,
                    platform,
                },
                queue_timeout,
                build_timeout,
            },
        ),
    }
}
