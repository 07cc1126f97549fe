//! Fork identity resolution.

use forkup_core::{BuildInfo, RepoId, UpdateConfig};

use crate::error::UpdateError;

/// Decide which repository this install tracks, or `None` when it is not a
/// fork.
///
/// A non-empty `OPENCLAW_FORK_REPO` is authoritative: it must parse as
/// `owner/repo`, and build metadata is never consulted in its place. Without
/// it, `sourceRepo` from build metadata is used. An identifier equal to the
/// canonical repository (any case) is not a fork.
pub fn resolve_fork_identity(
    config: &UpdateConfig,
    build_info: &BuildInfo,
) -> Result<Option<RepoId>, UpdateError> {
    let repo = match config.fork_repo_override.as_deref() {
        Some(raw) => Some(RepoId::parse(raw).map_err(|source| {
            UpdateError::InvalidForkOverride {
                value: raw.to_string(),
                source,
            }
        })?),
        None => build_info.source_repo_id(),
    };

    let Some(repo) = repo else {
        return Ok(None);
    };
    if repo.is_canonical() {
        tracing::debug!(repo = %repo, "install tracks the canonical repository");
        return Ok(None);
    }
    Ok(Some(repo))
}
