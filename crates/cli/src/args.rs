use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Administrative entry points for the odex execution core.
///
/// Meant for operators: inspect the scheduler, or clean up executions a
/// stopped process left behind.
#[derive(Parser, Debug)]
#[command(name = "odex", about = "Administrative commands for the odex execution core")]
pub struct CliArgs {
    /// Configuration profile; keys are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "ODEX_PROFILE", global = true)]
    pub profile: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Log queued and in-flight units and scheduler counters at INFO
    Dumpstatus {
        /// Also print the snapshot as JSON on stdout
        #[arg(long)]
        json: bool,
    },
    /// Mark executions left running by a stopped process as crashed
    Markcrashed {
        /// Store directory (default: DATA_DIR from the environment)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}
