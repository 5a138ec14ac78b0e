//! Serve command - run the catalog with the background sweeper.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use console::Style;
use folio_catalog::{BookDraft, CatalogService, RetentionSweeper};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Retention threshold in years (overrides config)
    #[arg(long)]
    pub retention_years: Option<u32>,

    /// Seconds between sweeps (overrides config)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Report expired books without deleting them
    #[arg(long)]
    pub dry_run: bool,

    /// Do not start the retention sweeper
    #[arg(long)]
    pub no_sweep: bool,

    /// Insert sample books before starting
    #[arg(long)]
    pub seed: bool,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<()> {
    let catalog = ctx.open_catalog()?;

    if args.seed {
        let count = seed(&catalog).await?;
        info!(count, "Seeded sample books");
    }

    let mut sweeper_config = ctx.sweeper_config();
    if let Some(years) = args.retention_years {
        if years == 0 {
            bail!("--retention-years must be at least 1");
        }
        sweeper_config = sweeper_config.with_retention_years(years);
    }
    if let Some(secs) = args.interval {
        if secs == 0 {
            bail!("--interval must be at least 1 second");
        }
        sweeper_config = sweeper_config.with_interval(Duration::from_secs(secs));
    }
    if args.dry_run {
        sweeper_config = sweeper_config.with_dry_run(true);
    }

    let dim = Style::new().dim();
    let sweep_enabled = ctx.config.retention().enabled && !args.no_sweep;
    let handle = if sweep_enabled {
        println!(
            "Retention sweeper: every {}s, purging books older than {} years{}",
            sweeper_config.interval.as_secs(),
            sweeper_config.retention_years,
            if sweeper_config.dry_run { " (dry run)" } else { "" }
        );
        let sweeper = Arc::new(RetentionSweeper::new(Arc::clone(&catalog), sweeper_config));
        Some(sweeper.spawn(CancellationToken::new()))
    } else {
        println!("{}", dim.apply_to("Retention sweeper disabled"));
        None
    };

    println!(
        "Folio catalog running ({} store)",
        ctx.config.store().backend
    );
    println!("Press Ctrl+C to stop");

    tokio::signal::ctrl_c().await?;

    // ── Graceful shutdown ──────────────────────────────────────────────

    println!();
    println!("{}", dim.apply_to("Shutting down..."));
    if let Some(handle) = handle {
        handle.shutdown().await;
    }

    let stats = catalog.cache_stats();
    if ctx.verbose {
        println!(
            "Cache: {} entries, {} hits, {} misses, {} rejected fills",
            stats.entries, stats.hits, stats.misses, stats.rejected_fills
        );
    }
    info!(hits = stats.hits, misses = stats.misses, "Catalog stopped");

    Ok(())
}

/// Insert a handful of sample books, some past the default retention.
async fn seed(catalog: &CatalogService) -> Result<usize> {
    let samples = [
        ("Integration Book", "Integration Author", "123-1234567890", (2023, 1, 1)),
        ("The Pragmatic Programmer", "Hunt & Thomas", "0-201-61622-X", (1999, 10, 20)),
        ("Structure and Interpretation", "Abelson & Sussman", "0-262-51087-1", (1996, 7, 25)),
        ("Zero to Production", "Palmieri", "979-8-4488-7601-9", (2022, 5, 1)),
    ];

    for (title, author, isbn, (y, m, d)) in samples {
        let Some(published) = NaiveDate::from_ymd_opt(y, m, d) else {
            bail!("invalid sample date {y}-{m}-{d}");
        };
        catalog
            .create(BookDraft::new(title, author, isbn, published))
            .await?;
    }
    Ok(samples.len())
}
