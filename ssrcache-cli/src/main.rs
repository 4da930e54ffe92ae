//! ssrcache CLI - Command-line interface
//!
//! Front end to the ssrcache library: cache gateway operations, one-shot
//! reaper sweeps, the long-running reaper daemon and the HTML transform
//! pipeline.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::cache::CacheArgs;
use commands::config::ConfigCommands;
use commands::reaper::SweepTarget;
use commands::transform::TransformArgs;

#[derive(Parser)]
#[command(name = "ssrcache")]
#[command(version = ssrcache::VERSION)]
#[command(about = "Tiered cache and resource reaper for server-side rendered pages", long_about = None)]
struct Cli {
    /// Configuration file (default: ~/.ssrcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging regardless of RUST_LOG
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reaper daemon until Ctrl-C
    Run,

    /// Look up the cached artifact for a URL without rendering
    Achieve(CacheArgs),

    /// Serve a URL from the cache, rendering it on a miss
    Fetch(CacheArgs),

    /// Store an HTML document as the rendered page for a URL
    Publish {
        /// Page URL
        url: String,
        /// HTML file to publish
        file: PathBuf,
        /// Only write the raw tier, skipping optimization
        #[arg(long)]
        raw_only: bool,
    },

    /// Re-render a URL, keeping the stale copy servable meanwhile
    Revalidate {
        /// Page URL
        url: String,
    },

    /// Remove every cached tier of a URL
    Evict {
        /// Page URL
        url: String,
    },

    /// Check one artifact file and evict it if idle
    Check {
        /// Tier file in the cache directory
        path: PathBuf,
    },

    /// Run one reaper sweep
    Sweep {
        #[command(subcommand)]
        target: SweepTarget,
    },

    /// Run the transform pipeline on an HTML file and print the result
    Transform(TransformArgs),

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let options = runner::RunnerOptions {
        config_path: cli.config,
        debug: cli.debug,
    };

    let result = match cli.command {
        Commands::Run => commands::reaper::run_daemon(options).await,
        Commands::Achieve(args) => commands::cache::achieve(options, args),
        Commands::Fetch(args) => commands::cache::fetch(options, args).await,
        Commands::Publish {
            url,
            file,
            raw_only,
        } => commands::cache::publish(options, &url, &file, raw_only).await,
        Commands::Revalidate { url } => commands::cache::revalidate(options, &url).await,
        Commands::Evict { url } => commands::cache::evict(options, &url).await,
        Commands::Check { path } => commands::reaper::check(options, &path).await,
        Commands::Sweep { target } => commands::reaper::sweep(options, target).await,
        Commands::Transform(args) => commands::transform::run(options, args),
        Commands::Config { command } => commands::config::run(options, command),
    };

    if let Err(e) = result {
        e.exit();
    }
}
