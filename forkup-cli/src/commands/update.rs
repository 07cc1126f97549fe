//! `forkup update`: run the fork update pipeline.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{ArgAction, Args};
use forkup_core::{PipelineOptions, RepoId};
use forkup_pipeline::{prepare_fork_update, ProcessRunner, StepOutcome, StepRecord, UpdateSummary};
use serde::Serialize;

use super::{exit_if_fork_root_missing, load_config};

/// Arguments for `forkup update`.
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Restart the gateway after installing.
    #[arg(long, action = ArgAction::Set, default_value_t = true, value_name = "BOOL")]
    pub restart: bool,

    /// Shorthand for `--restart false`.
    #[arg(long)]
    pub no_restart: bool,

    /// Release channel. Ignored for fork installs.
    #[arg(long)]
    pub channel: Option<String>,

    /// Release tag. Ignored for fork installs.
    #[arg(long)]
    pub tag: Option<String>,

    /// Emit the run summary as JSON.
    #[arg(long)]
    pub json: bool,
}

/// `--json` payload for a run that aborted part way.
#[derive(Serialize)]
struct FailedRunJson<'a> {
    fork: bool,
    ok: bool,
    repo: &'a RepoId,
    fork_root: &'a Path,
    error: String,
    history: &'a [StepRecord],
}

impl UpdateArgs {
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            restart: self.restart && !self.no_restart,
            channel: self.channel.clone(),
            tag: self.tag.clone(),
        }
    }

    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let options = self.options();
        tracing::debug!(?options, install_root = %config.install_root.display(), "starting fork update");

        let runner = ProcessRunner;
        let prepared = prepare_fork_update(&config, &runner)
            .await
            .map_err(exit_if_fork_root_missing)
            .context("fork update failed")?;

        let Some(mut pipeline) = prepared else {
            if self.json {
                println!("{}", serde_json::json!({ "fork": false }));
            } else {
                println!("Not a fork install; no fork update needed.");
            }
            return Ok(());
        };

        let result = pipeline.run(&options).await;
        let summary = match result {
            Ok(summary) => summary,
            Err(err) => {
                if self.json {
                    let payload = FailedRunJson {
                        fork: true,
                        ok: false,
                        repo: pipeline.repo(),
                        fork_root: pipeline.root(),
                        error: err.to_string(),
                        history: pipeline.history(),
                    };
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&payload)
                            .context("failed to serialize update history")?
                    );
                } else {
                    print_history(pipeline.history());
                }
                return Err(err).context("fork update failed");
            }
        };

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary)
                    .context("failed to serialize update summary")?
            );
        } else {
            print_summary(&summary);
        }
        Ok(())
    }
}

fn print_history(history: &[StepRecord]) {
    for record in history {
        match &record.outcome {
            StepOutcome::Succeeded => {
                println!("  ✓  {} ({} ms)", record.step, record.duration_ms)
            }
            StepOutcome::Skipped { reason } => println!("  ·  {} ({reason})", record.step),
            StepOutcome::Failed { detail } => println!("  ✗  {}: {detail}", record.step),
        }
    }
}

fn print_summary(summary: &UpdateSummary) {
    print_history(&summary.history);
    if !summary.ignored_flags.is_empty() {
        println!(
            "Ignored for fork installs: {}",
            summary.ignored_flags.join(", ")
        );
    }
    println!(
        "✓ '{}' updated from {} and installed from {}",
        summary.repo,
        summary.fork_root.display(),
        summary.artifact.display()
    );
    if !summary.restarted {
        println!("Gateway not restarted; the running gateway still uses the previous build.");
    }
}
