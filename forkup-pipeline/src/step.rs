//! Step identification, history, and the single execution chokepoint.

use std::fmt;
use std::time::{Duration, Instant};

use forkup_core::StepResult;
use serde::Serialize;

use crate::error::UpdateError;
use crate::runner::{CommandRunner, CommandSpec};

/// Every stage of a fork update, in execution order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepName {
    Preflight,
    EnsureUpstream,
    Fetch,
    Checkout,
    Rebase,
    Push,
    InstallDeps,
    Build,
    Pack,
    GlobalInstall,
    Restart,
    SmokeTest { agent: String },
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepName::Preflight => write!(f, "preflight (clean working tree)"),
            StepName::EnsureUpstream => write!(f, "ensure upstream remote"),
            StepName::Fetch => write!(f, "git fetch"),
            StepName::Checkout => write!(f, "git checkout"),
            StepName::Rebase => write!(f, "git rebase"),
            StepName::Push => write!(f, "git push"),
            StepName::InstallDeps => write!(f, "install dependencies"),
            StepName::Build => write!(f, "build"),
            StepName::Pack => write!(f, "pack"),
            StepName::GlobalInstall => write!(f, "global install"),
            StepName::Restart => write!(f, "gateway restart"),
            StepName::SmokeTest { agent } => write!(f, "smoke test ({agent})"),
        }
    }
}

/// How a step ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Succeeded,
    Skipped { reason: String },
    Failed { detail: String },
}

/// One entry of the pipeline history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    #[serde(flatten)]
    pub step: StepName,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub duration_ms: u128,
}

/// Runs pipeline commands through a [`CommandRunner`] with uniform failure
/// handling and keeps the history of every step.
pub struct StepRunner<'a> {
    runner: &'a dyn CommandRunner,
    timeout: Duration,
    history: Vec<StepRecord>,
}

impl<'a> StepRunner<'a> {
    pub fn new(runner: &'a dyn CommandRunner, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            history: Vec::new(),
        }
    }

    /// Run `spec` as `step`. A non-zero exit becomes [`UpdateError::Step`]
    /// carrying stderr (or stdout) as detail.
    pub async fn run_step(
        &mut self,
        step: StepName,
        spec: &CommandSpec,
    ) -> Result<StepResult, UpdateError> {
        self.run_step_with(step, spec, |_| Ok(())).await
    }

    /// Like [`run_step`](Self::run_step), but a zero exit must also pass
    /// `validate` for the step to count as succeeded.
    pub async fn run_step_with<F>(
        &mut self,
        step: StepName,
        spec: &CommandSpec,
        validate: F,
    ) -> Result<StepResult, UpdateError>
    where
        F: FnOnce(&StepResult) -> Result<(), UpdateError>,
    {
        tracing::info!(step = %step, command = %spec, "running step");
        let started = Instant::now();
        let result = self.runner.run(spec, self.timeout).await;
        let elapsed = started.elapsed();

        let verdict = if result.success() {
            validate(&result)
        } else {
            Err(UpdateError::Step {
                step: step.clone(),
                detail: result.diagnostic(),
            })
        };

        match verdict {
            Ok(()) => {
                self.record(step, StepOutcome::Succeeded, Some(spec), elapsed);
                Ok(result)
            }
            Err(err) => {
                tracing::error!(step = %step, code = result.code, error = %err, "step failed");
                let detail = match &err {
                    UpdateError::Step { detail, .. } => detail.clone(),
                    other => other.to_string(),
                };
                self.record(step, StepOutcome::Failed { detail }, Some(spec), elapsed);
                Err(err)
            }
        }
    }

    /// Run a read-only query outside the history; the caller interprets the
    /// result.
    pub async fn query(&self, spec: &CommandSpec, timeout: Duration) -> StepResult {
        tracing::debug!(command = %spec, "query");
        self.runner.run(spec, timeout).await
    }

    pub fn skip(&mut self, step: StepName, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::info!(step = %step, reason = %reason, "skipping step");
        self.record(step, StepOutcome::Skipped { reason }, None, Duration::ZERO);
    }

    /// Record a step whose success or failure was decided by the caller.
    pub fn record(
        &mut self,
        step: StepName,
        outcome: StepOutcome,
        spec: Option<&CommandSpec>,
        elapsed: Duration,
    ) {
        self.history.push(StepRecord {
            step,
            outcome,
            command: spec.map(ToString::to_string),
            duration_ms: elapsed.as_millis(),
        });
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }
}
