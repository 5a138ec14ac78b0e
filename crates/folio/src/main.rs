//! Folio - cached book catalog with a background retention sweeper
//!
//! Main entry point for the Folio CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

mod commands;

use commands::{books, config, serve, sweep};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Folio - cached book catalog with a background retention sweeper
#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Config directory (default: platform config dir)
    #[arg(long, global = true, env = "FOLIO_CONFIG_DIR")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the catalog with the retention sweeper until Ctrl+C
    Serve(serve::ServeArgs),

    /// List all books
    List,

    /// Show a single book
    Get(books::GetArgs),

    /// Add a book
    Add(books::AddArgs),

    /// Update fields of a book
    Update(books::UpdateArgs),

    /// Delete a book
    Delete(books::DeleteArgs),

    /// Run one retention sweep now
    Sweep(sweep::SweepArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_dir = cli.config.clone().or_else(folio_config::xdg_config_dir);

    // Console (human-readable, stderr) + rotating JSON file
    let filter = if cli.verbose {
        "folio=debug,folio_catalog=debug,folio_store=debug,folio_cache=debug,folio_config=debug,info"
    } else {
        "folio=info,folio_catalog=info,folio_store=info,warn"
    };

    let log_dir = config_dir
        .as_ref()
        .map(|d| d.join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "folio.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "folio=trace,folio_catalog=trace,folio_store=debug,folio_cache=trace,folio_config=debug,info",
                )),
        )
        .init();

    let loaded = folio_config::load_config_with_options(None, config_dir.as_deref())?;
    for warning in &loaded.warnings {
        warn!("{}", warning);
    }

    let ctx = commands::Context {
        config: loaded.config.clone(),
        config_dir,
        sources: loaded.loaded_from().iter().map(|p| p.to_path_buf()).collect(),
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Serve(args) => serve::run(args, &ctx).await,
        Commands::List => books::list(&ctx).await,
        Commands::Get(args) => books::get(args, &ctx).await,
        Commands::Add(args) => books::add(args, &ctx).await,
        Commands::Update(args) => books::update(args, &ctx).await,
        Commands::Delete(args) => books::delete(args, &ctx).await,
        Commands::Sweep(args) => sweep::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}
