//! Breach-Check CLI entry point

use std::io;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use breach_check::{run, Args};

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout is reserved for the response record
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    run(args.command, &mut stdout.lock())
}
