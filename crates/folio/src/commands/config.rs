//! Config command - configuration management.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use console::Style;
use folio_config::FolioConfig;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration and where it came from
    Show,

    /// Show the user config file path
    Path,

    /// Initialize a config file with defaults
    Init {
        /// Create project-local config (./folio.toml) instead of user config
        #[arg(long)]
        local: bool,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(ctx),
        ConfigCommand::Init { local, force } => cmd_init(ctx, local, force),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    // Effective values, with every section filled in
    let effective = FolioConfig {
        cache: Some(ctx.config.cache()),
        retention: Some(ctx.config.retention()),
        store: Some(ctx.config.store()),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&effective)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("# Folio Configuration\n");
    if ctx.sources.is_empty() {
        println!("{}", dim.apply_to("# No config files loaded (using defaults)"));
    } else {
        for path in &ctx.sources {
            println!("{}", dim.apply_to(format!("# Loaded: {}", path.display())));
        }
    }
    println!();
    print!("{}", effective.to_toml()?);
    Ok(())
}

fn user_config_file(ctx: &Context) -> Result<PathBuf> {
    let dir = ctx
        .config_dir
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
    Ok(dir.join("config.toml"))
}

fn cmd_path(ctx: &Context) -> Result<()> {
    println!("{}", user_config_file(ctx)?.display());
    Ok(())
}

fn cmd_init(ctx: &Context, local: bool, force: bool) -> Result<()> {
    let path = if local {
        PathBuf::from("folio.toml")
    } else {
        user_config_file(ctx)?
    };

    if path.exists() && !force {
        println!("Config file already exists: {}", path.display());
        println!("Use --force to overwrite it.");
        return Ok(());
    }

    folio_config::save_config(&FolioConfig::with_defaults(), &path)?;

    let green = Style::new().green();
    println!("{} Created config file: {}", green.apply_to("✓"), path.display());
    Ok(())
}
