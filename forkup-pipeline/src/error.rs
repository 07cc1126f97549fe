//! Error types for forkup-pipeline.

use std::path::PathBuf;

use thiserror::Error;

use forkup_core::{CoreError, RepoId};

use crate::step::StepName;

/// Every way a fork update can abort. All variants are fatal; nothing is
/// retried or rolled back.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// No candidate checkout has an `origin` remote pointing at the fork.
    #[error(
        "fork checkout for {repo} not found (searched: {searched}); clone {url} into {suggested} or set OPENCLAW_FORK_ROOT to the checkout path",
        searched = display_paths(.searched),
        url = .repo.https_url(),
        suggested = .suggested.display(),
    )]
    ForkRootNotFound {
        repo: RepoId,
        searched: Vec<PathBuf>,
        suggested: PathBuf,
    },

    /// `OPENCLAW_FORK_REPO` is set but is not `owner/repo`.
    #[error("OPENCLAW_FORK_REPO='{value}' is not an owner/repo identifier")]
    InvalidForkOverride {
        value: String,
        #[source]
        source: CoreError,
    },

    /// `git status --porcelain` reported local changes.
    #[error("fork checkout at {path} has uncommitted changes; commit or stash them first:\n{status}")]
    DirtyWorkingTree { path: PathBuf, status: String },

    /// An external command exited non-zero or timed out.
    #[error("{step} failed: {detail}")]
    Step { step: StepName, detail: String },

    /// The packer succeeded but printed no artifact filename.
    #[error("pack succeeded but reported no artifact filename in {dir}")]
    MissingArtifact { dir: PathBuf },

    #[error(transparent)]
    Core(#[from] CoreError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "no candidates".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
