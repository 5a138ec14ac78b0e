//! Sweep command - run one retention sweep now.

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use folio_catalog::{RetentionSweeper, SweepOutcome, SweepReport};

use super::Context;

/// Arguments for the sweep command.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Report expired books without deleting them
    #[arg(long)]
    pub dry_run: bool,

    /// Retention threshold in years (overrides config)
    #[arg(long)]
    pub retention_years: Option<u32>,
}

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.sweeper_config();
    if args.dry_run {
        config = config.with_dry_run(true);
    }
    if let Some(years) = args.retention_years {
        if years == 0 {
            bail!("--retention-years must be at least 1");
        }
        config = config.with_retention_years(years);
    }

    let catalog = ctx.open_catalog()?;
    let sweeper = RetentionSweeper::new(catalog, config);

    match sweeper.sweep_once().await? {
        SweepOutcome::Completed(report) => {
            if ctx.json_output {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report, ctx.verbose);
            }
        }
        SweepOutcome::Skipped => {
            let dim = Style::new().dim();
            println!("{}", dim.apply_to("A sweep is already running"));
        }
    }
    Ok(())
}

fn print_report(report: &SweepReport, verbose: bool) {
    let dim = Style::new().dim();
    let title = if report.dry_run {
        "Retention Sweep (dry run)"
    } else {
        "Retention Sweep"
    };
    println!("{}", style(title).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("  {:<14} {}", dim.apply_to("Cutoff"), report.cutoff);
    println!("  {:<14} {}", dim.apply_to("Scanned"), report.scanned);
    println!("  {:<14} {}", dim.apply_to("Expired"), report.expired);
    println!("  {:<14} {}", dim.apply_to("Deleted"), report.deleted);
    if report.already_gone > 0 {
        println!("  {:<14} {}", dim.apply_to("Already gone"), report.already_gone);
    }
    if report.failed > 0 {
        let red = Style::new().red();
        println!("  {:<14} {}", dim.apply_to("Failed"), red.apply_to(report.failed));
    }
    if report.cancelled {
        println!("{}", dim.apply_to("Sweep was cancelled before finishing"));
    }

    if verbose && !report.deleted_ids.is_empty() {
        println!();
        for id in &report.deleted_ids {
            println!("  {} {}", dim.apply_to("-"), id);
        }
    }
}
