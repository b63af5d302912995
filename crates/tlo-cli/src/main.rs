use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tlo_cli::commands::{project, resolve, streamline, util};
use tlo_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .with_cli(&cli);
    tracing::debug!(?config, "loaded configuration");
    let streamliner = config.streamliner()?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match command {
        Commands::Streamline { file, occlusions } => {
            let events = util::read_events(file.as_deref())?;
            let summary = streamline::run(&mut out, &streamliner, events, *occlusions)?;
            if summary.dropped > 0 {
                tracing::info!(dropped = summary.dropped, "some events were dropped");
            }
        }
        Commands::Resolve { event, file } => {
            let timeline = util::read_events(file.as_deref())?;
            resolve::run(&mut out, &streamliner, event, &timeline)?;
        }
        Commands::Project { file } => {
            let events = util::read_events(file.as_deref())?;
            project::run(&mut out, &streamliner, &events)?;
        }
    }
    out.flush()?;

    Ok(())
}
