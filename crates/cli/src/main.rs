//! appshift command-line entry point.
//!
//! Runs the manifest migration for a page and inspects the stored state.
//! Logging goes to stderr so command output on stdout stays machine-readable.

use std::path::PathBuf;

use anyhow::Result;
use appshift_core::AppConfig;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "appshift")]
#[command(about = "Move pages from a cache manifest onto versioned cache generations")]
#[command(version)]
struct Cli {
    /// TOML config file (default: $APPSHIFT_CONFIG_FILE)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate a page: refresh its manifest generation and record the page against it
    Migrate {
        /// URL of the page
        page_url: String,

        /// Manifest reference, relative to the page. Read from the page's
        /// `<html manifest>` attribute when omitted.
        #[arg(short, long)]
        manifest: Option<String>,
    },

    /// Print the generation history recorded for a manifest
    History {
        /// Absolute manifest URL
        manifest_url: String,
    },

    /// List page to manifest associations
    Pages,

    /// List cache generations in creation order
    Generations,
}

fn init_tracing(json: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);

    if json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load_from(Some(path))?,
        None => AppConfig::load()?,
    };

    match cli.command {
        Command::Migrate { page_url, manifest } => commands::migrate(&config, &page_url, manifest.as_deref()).await,
        Command::History { manifest_url } => commands::history(&config, &manifest_url).await,
        Command::Pages => commands::pages(&config).await,
        Command::Generations => commands::generations(&config).await,
    }
}
