use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tb_cli::commands::{check, generate, normalize, prompt};
use tb_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so stdout stays machine-readable
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let mut stdout = io::stdout().lock();
    match &cli.command {
        Some(Commands::Generate(args)) => {
            let config = load_config(&cli)?;
            generate::run(&mut stdout, args, &config)?;
        }
        Some(Commands::Check(args)) => {
            let config = load_config(&cli)?;
            if !check::run(&mut stdout, args, &config)? {
                stdout.flush()?;
                std::process::exit(1);
            }
        }
        Some(Commands::Prompt(args)) => {
            prompt::run(&mut stdout, args)?;
        }
        Some(Commands::Normalize { time }) => {
            normalize::run(&mut stdout, time)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}
