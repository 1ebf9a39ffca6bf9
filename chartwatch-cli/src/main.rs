//! chartwatch: re-render a Helm chart on change and print selected resources.
//!
//! # Usage
//!
//! ```text
//! chartwatch watch  --chart <PATH> --filter KIND[=PATTERN]... [-f VALUES]... [--watch PATH]... [-- ARGS...]
//! chartwatch render --chart <PATH> --kind <KIND> [--resource <PATTERN>] [--name RELEASE] [-- ARGS...]
//! ```
//!
//! Documents go to stdout, diagnostics to stderr.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{render::RenderArgs, watch::WatchArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "chartwatch",
    version,
    about = "Watch a Helm chart and print the resources you care about",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render now, then again whenever the chart or its values change.
    Watch(WatchArgs),

    /// Render once and exit. Fails when the chart does not render.
    Render(RenderArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Watch(args) => args.run(),
        Commands::Render(args) => args.run(),
    }
}
