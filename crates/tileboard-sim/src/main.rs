#![warn(missing_docs)]

//! Entry point for the `tileboard-sim` binary.

mod cli;
mod error;
mod script;
mod session;

use std::process;

use clap::Parser;
use tileboard_dispatch::{DispatcherConfig, StopPolicy};
use tracing::error;

use crate::{cli::Cli, error::Result};

fn main() {
    if let Err(err) = run() {
        error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

/// Parse CLI arguments, install logging, replay the script and print the outcome.
fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(&cli.log.spec()).ok();

    let mut cfg = match &cli.config {
        Some(path) => DispatcherConfig::load_from_path(path)?,
        None => DispatcherConfig::default(),
    };
    if let Some(timeout) = cli.stop_timeout {
        cfg.stop_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    }
    if cli.drain {
        cfg.stop_policy = StopPolicy::Drain;
    }

    let commands = match &cli.script {
        Some(path) => script::load(path)?,
        None => script::demo(),
    };
    let summary = session::run(&cfg, commands, cli.settle, !cli.no_save)?;

    println!("replayed:   {}", summary.replayed);
    println!("executed:   {}", summary.executed);
    println!("coalesced:  {}", summary.coalesced);
    println!("final save: {:?}", summary.final_save);
    println!("persisted:  {}", summary.persisted);
    println!("frames:     {}", summary.host.frames);
    println!("last pixel: {:?}", summary.host.last_pixel.map(|p| format!("{p:#010x}")));
    println!("dialogs:    {:?}", summary.host.dialogs);
    println!("game over:  {}", summary.host.game_over_events);
    println!("snapshot:   {:#?}", summary.snapshot);
    Ok(())
}
