//! forkup: keep a forked OpenClaw install rebased on upstream.
//!
//! # Usage
//!
//! ```text
//! forkup update [--restart <true|false>] [--no-restart] [--channel <c>] [--tag <t>] [--json]
//! forkup status [--json]
//! forkup plan [--no-restart] [--json]
//! ```

mod commands;

use std::future::Future;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use commands::{plan::PlanArgs, status::StatusArgs, update::UpdateArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "forkup",
    version,
    about = "Rebase, rebuild and reinstall a forked OpenClaw checkout",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rebase the fork onto upstream, rebuild, reinstall and smoke test it.
    Update(UpdateArgs),

    /// Show build metadata, fork identity and the located checkout.
    Status(StatusArgs),

    /// Print the steps `update` would run without running them.
    Plan(PlanArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    match cli.command {
        Commands::Update(args) => block_on(args.run()),
        Commands::Status(args) => block_on(args.run()),
        Commands::Plan(args) => block_on(args.run()),
    }
}

fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;
    runtime.block_on(future)
}

/// Diagnostics go to stderr so `--json` output on stdout stays parseable.
fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
