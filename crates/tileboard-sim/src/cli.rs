//! Command-line interface definitions for tileboard-sim.

use std::{path::PathBuf, time::Duration};

use clap::Parser;
use logging::LogArgs;

/// Command-line interface for the `tileboard-sim` binary.
#[derive(Parser, Debug)]
#[command(
    name = "tileboard-sim",
    about = "Replay a command script through the tileboard dispatcher",
    version
)]
pub struct Cli {
    /// Logging controls shared across tileboard binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// Command script in RON syntax, a list like `[Layout((...)), Draw, Save]`.
    /// Without one a built-in demo burst is replayed.
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Dispatcher configuration file (RON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured stop timeout.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub stop_timeout: Option<Duration>,

    /// How long to let the queue empty before requesting stop.
    #[arg(
        long,
        value_parser = humantime::parse_duration,
        default_value = "2s",
        value_name = "DURATION"
    )]
    pub settle: Duration,

    /// Skip the final save.
    #[arg(long)]
    pub no_save: bool,

    /// Execute commands still queued at stop instead of discarding them.
    #[arg(long)]
    pub drain: bool,
}
