//! `forkup plan`: list the update steps without running them.

use anyhow::{Context, Result};
use clap::Args;
use forkup_core::PipelineOptions;
use forkup_pipeline::{prepare_fork_update, PlannedStep, ProcessRunner};

use super::{exit_if_fork_root_missing, load_config};

/// Arguments for `forkup plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plan without the gateway restart.
    #[arg(long)]
    pub no_restart: bool,

    /// Emit the plan as JSON.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let runner = ProcessRunner;
        let prepared = prepare_fork_update(&config, &runner)
            .await
            .map_err(exit_if_fork_root_missing)
            .context("failed to prepare fork update")?;

        let Some(pipeline) = prepared else {
            println!("Not a fork install; nothing to plan.");
            return Ok(());
        };

        let options = PipelineOptions {
            restart: !self.no_restart,
            ..PipelineOptions::default()
        };
        let plan = pipeline.plan(&options);

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("failed to serialize plan")?
            );
            return Ok(());
        }

        println!(
            "Plan for '{}' in {}:",
            pipeline.repo(),
            pipeline.root().display()
        );
        print_plan(&plan);
        Ok(())
    }
}

fn print_plan(plan: &[PlannedStep]) {
    for (index, planned) in plan.iter().enumerate() {
        println!("{:>3}. {}", index + 1, planned.step);
        println!("       $ {}", planned.command);
        if let Some(note) = &planned.note {
            println!("       ({note})");
        }
    }
}
