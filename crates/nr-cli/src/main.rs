use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use nr_cli::commands::{report, summarize, watch};
use nr_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so CSV and JSON on stdout stay clean.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match cli.command {
        Some(Commands::Watch { path, no_save }) => {
            let config = load_config(cli.config.as_deref())?;
            let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
            runtime.block_on(watch::run(path, &config, !no_save))?;
        }
        Some(Commands::Summarize { path, json, save }) => {
            let config = load_config(cli.config.as_deref())?;
            summarize::run(&path, &config, json, save)?;
        }
        Some(Commands::Report {
            directory,
            field,
            output,
            per_day,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            let directory = directory.unwrap_or_else(|| config.save_dir.clone());
            let field = field.unwrap_or_else(|| config.rate_field.clone());
            let mut projection = config.projection();
            if let Some(per_day) = per_day {
                projection.per_day = per_day;
            }
            report::run(&directory, &field, &projection, output.as_deref())?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
