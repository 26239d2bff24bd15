use clap::{Args, Parser, Subcommand};
use std::{path::PathBuf, time::Duration};

use crate::policy::ApplyPolicy;

/// Parsed command line. Flags given without a subcommand imply `run`.
#[derive(Debug, Parser)]
#[command(
    name = "trafficlink",
    version,
    about = "Serial control panel for a traffic-light controller board",
    args_conflicts_with_subcommands = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub run: RunOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Connect to the board and run the interactive panel (default).
    Run(RunOptions),
    /// List serial ports visible to this machine.
    Ports,
    /// Print the config file path and contents, creating defaults if missing.
    Config {
        /// Use this file instead of the default location.
        #[arg(long, env = "TRAFFICLINK_CONFIG")]
        config: Option<PathBuf>,
    },
}

/// Options for the `run` command; values are `None` when not provided on CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Args)]
pub struct RunOptions {
    /// Serial device path (default from config: /dev/ttyACM0)
    #[arg(long)]
    pub device: Option<String>,
    /// Baud rate (default 9600)
    #[arg(long)]
    pub baud: Option<u32>,
    /// When duration edits are sent: immediate, batch or delta-only
    #[arg(long)]
    pub policy: Option<ApplyPolicy>,
    /// Scheduler tick period, e.g. "16ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub tick: Option<Duration>,
    /// Number of raw inbound lines kept for display
    #[arg(long = "log-len")]
    pub log_len: Option<usize>,
    /// error, warn, info, debug or trace
    #[arg(long = "log-level")]
    pub log_level: Option<String>,
    /// Append logs to this file instead of stderr
    #[arg(long = "log-file")]
    pub log_file: Option<PathBuf>,
    /// Use this config file instead of the default location
    #[arg(long, env = "TRAFFICLINK_CONFIG")]
    pub config: Option<PathBuf>,
    /// Start disconnected; use the `connect` console command later
    #[arg(long = "no-connect")]
    pub no_connect: bool,
}

impl Cli {
    /// Resolve the implicit `run` subcommand.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Run(self.run))
    }
}
