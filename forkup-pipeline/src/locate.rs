//! Fork root discovery: find the checkout whose `origin` is the fork.

use std::path::{Path, PathBuf};
use std::time::Duration;

use forkup_core::{parse_remote_url, RepoId};

use crate::error::UpdateError;
use crate::runner::{CommandRunner, CommandSpec};

/// Probe `candidates` in order and return the first checkout whose `origin`
/// remote parses to `target` (case-insensitive).
///
/// Candidates without `.git`, or whose remote query fails or times out, are
/// skipped. `probe_timeout` bounds both the existence check and the query.
/// `clone_hint` is the location suggested to the operator when nothing
/// matches.
pub async fn locate_fork_root(
    runner: &dyn CommandRunner,
    target: &RepoId,
    candidates: &[PathBuf],
    clone_hint: &Path,
    probe_timeout: Duration,
) -> Result<PathBuf, UpdateError> {
    for candidate in candidates {
        if !has_git_metadata(candidate, probe_timeout).await {
            tracing::debug!(path = %candidate.display(), "no git metadata, skipping");
            continue;
        }

        let spec = CommandSpec::git(["remote", "get-url", "origin"]).in_dir(candidate);
        let result = runner.run(&spec, probe_timeout).await;
        if !result.success() {
            tracing::debug!(path = %candidate.display(), detail = %result.diagnostic(), "origin lookup failed");
            continue;
        }

        match parse_remote_url(&result.stdout) {
            Some(origin) if origin == *target => {
                tracing::info!(path = %candidate.display(), repo = %origin, "found fork checkout");
                return Ok(candidate.clone());
            }
            Some(origin) => {
                tracing::debug!(path = %candidate.display(), origin = %origin, "origin is a different repository");
            }
            None => {
                tracing::debug!(path = %candidate.display(), url = result.stdout.trim(), "origin URL not recognised");
            }
        }
    }

    Err(UpdateError::ForkRootNotFound {
        repo: target.clone(),
        searched: candidates.to_vec(),
        suggested: clone_hint.to_path_buf(),
    })
}

async fn has_git_metadata(candidate: &Path, timeout: Duration) -> bool {
    let marker = candidate.join(".git");
    matches!(
        tokio::time::timeout(timeout, tokio::fs::try_exists(&marker)).await,
        Ok(Ok(true))
    )
}
