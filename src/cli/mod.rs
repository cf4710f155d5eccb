pub mod monitor;
pub mod run;
pub mod source;

use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use monitor::handle_monitor;
use run::handle_run;
use source::handle_devices;

use crate::config::Config;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a config file to use instead of the default search paths
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the tabletpressure daemon (default)
    Run,
    /// List the pen tablets that can be used
    Devices,
    /// Print stylus pressure and position without sending MIDI
    Monitor,
}

pub async fn main_cli(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = Config::load(args.config.as_deref())?;
    log::debug!("Using config: {config:?}");

    match args.cmd.unwrap_or(Commands::Run) {
        Commands::Run => handle_run(config).await?,
        Commands::Devices => handle_devices(&config.source)?,
        Commands::Monitor => handle_monitor(config).await?,
    }

    Ok(())
}
