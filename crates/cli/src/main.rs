mod args;
mod commands;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use odex_compute::scheduler::instance::set_instance;
use odex_compute::{SchedulerConfig, UserRoundRobinScheduler};
use odex_core::config::{load_dotenv, Config};

use crate::args::{CliArgs, Command};

fn main() -> Result<()> {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let config = match args.profile.as_deref() {
        Some(profile) => Config::for_profile(profile),
        None => Config::from_env(),
    };
    config.log_summary();

    let mut stdout = io::stdout();
    match args.command {
        Command::Dumpstatus { json } => {
            let scheduler = UserRoundRobinScheduler::new(SchedulerConfig::from(&config.scheduler))
                .context("failed to start scheduler")?;
            set_instance(Arc::new(scheduler));
            commands::dump_status(json, &mut stdout)?;
        }
        Command::Markcrashed { data_dir } => {
            let data_dir = data_dir.unwrap_or_else(|| config.storage.data_dir.clone());
            commands::mark_crashed(&data_dir, &mut stdout)?;
        }
    }
    Ok(())
}
