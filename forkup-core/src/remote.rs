//! Extraction of `owner/repo` from git remote URLs.
//!
//! Recognised forms (host matched case-insensitively, `.git` optional):
//!
//! ```text
//! git@github.com:owner/repo.git
//! https://github.com/owner/repo.git
//! https://user@github.com/owner/repo
//! ssh://git@github.com[:22]/owner/repo.git
//! git://github.com/owner/repo.git
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::types::RepoId;

const REMOTE_PATTERN: &str = concat!(
    r"^(?:git@(?i:github\.com):",
    r"|(?i:https?|ssh|git)://(?:[^@/\s]+@)?(?i:github\.com)(?::\d+)?/)",
    r"(?P<owner>[^/\s]+)/(?P<repo>[^/\s]+?)(?:\.git)?/*$",
);

fn remote_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(REMOTE_PATTERN).ok())
        .as_ref()
}

/// Parse a remote URL into a [`RepoId`].
///
/// Returns `None` for other hosts, extra path segments, or a missing owner
/// or repository.
pub fn parse_remote_url(url: &str) -> Option<RepoId> {
    let captures = remote_pattern()?.captures(url.trim())?;
    let owner = captures.name("owner")?.as_str();
    let repo = captures.name("repo")?.as_str();
    RepoId::new(owner, repo).ok()
}
