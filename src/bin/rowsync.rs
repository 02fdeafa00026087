//! Rowsync CLI binary.

use clap::Parser;
use rowsync::cli::{map_error, Cli, RunContext};
use rowsync::config::ConfigLoader;
use rowsync::logging::init_logging;
use std::process;
use tracing::{error, info};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref())?;
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.logging.format = format.clone();
    }
    init_logging(Some(&config.logging))?;

    let context = match RunContext::new(&config) {
        Ok(context) => context,
        Err(e) => {
            error!("Error initializing systems: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            info!("Command completed");
            println!("{}", output);
            Ok(())
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}
