//! Upstream remote setup.

use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::UpdateError;
use crate::runner::CommandSpec;
use crate::step::{StepName, StepOutcome, StepRunner};

/// Make sure `remote` exists in the checkout at `root`.
///
/// When `git remote get-url <remote>` already resolves, nothing changes.
/// Otherwise the remote is added pointing at `url`, an HTTPS address so a
/// remote the operator never configured does not need SSH credentials.
/// Failure to add it is fatal.
pub async fn ensure_upstream_remote(
    steps: &mut StepRunner<'_>,
    root: &Path,
    remote: &str,
    url: &str,
    probe_timeout: Duration,
) -> Result<(), UpdateError> {
    let started = Instant::now();
    let lookup = CommandSpec::git(["remote", "get-url", remote]).in_dir(root);
    let existing = steps.query(&lookup, probe_timeout).await;

    if existing.success() && !existing.stdout.trim().is_empty() {
        tracing::info!(remote, url = existing.stdout.trim(), "upstream remote already configured");
        steps.record(
            StepName::EnsureUpstream,
            StepOutcome::Skipped {
                reason: format!("{remote} -> {}", existing.stdout.trim()),
            },
            Some(&lookup),
            started.elapsed(),
        );
        return Ok(());
    }

    tracing::info!(remote, url, "adding upstream remote");
    steps
        .run_step(StepName::EnsureUpstream, &add_remote_command(root, remote, url))
        .await?;
    Ok(())
}

pub(crate) fn add_remote_command(root: &Path, remote: &str, url: &str) -> CommandSpec {
    CommandSpec::git(["remote", "add", remote, url]).in_dir(root)
}
