//! Domain types shared by the pipeline and the CLI.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Identifier of the canonical upstream project. An install tracking this
/// repository is never treated as a fork.
pub const CANONICAL_REPO: &str = "openclaw/openclaw";

// ---------------------------------------------------------------------------
// RepoId
// ---------------------------------------------------------------------------

/// A normalized `owner/repo` identifier.
///
/// Display preserves the original case; equality and hashing ignore it, so
/// `Owner/Repo` and `owner/repo` name the same repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoId {
    owner: String,
    name: String,
}

impl RepoId {
    /// Build an identifier from already-split parts. A trailing `.git` on the
    /// repository name is stripped.
    pub fn new(owner: &str, name: &str) -> Result<Self, CoreError> {
        let owner = owner.trim();
        let name = name.trim();
        let name = name.strip_suffix(".git").unwrap_or(name);
        let valid =
            |part: &str| !part.is_empty() && !part.contains(|c: char| c == '/' || c.is_whitespace());
        if !valid(owner) || !valid(name) {
            return Err(CoreError::InvalidRepoId {
                value: format!("{owner}/{name}"),
            });
        }
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse an explicit `owner/repo` string (surrounding whitespace allowed).
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let trimmed = value.trim();
        match trimmed.split_once('/') {
            Some((owner, name)) => Self::new(owner, name).map_err(|_| CoreError::InvalidRepoId {
                value: trimmed.to_string(),
            }),
            None => Err(CoreError::InvalidRepoId {
                value: trimmed.to_string(),
            }),
        }
    }

    /// The canonical upstream repository.
    pub fn canonical() -> Self {
        Self {
            owner: "openclaw".to_string(),
            name: "openclaw".to_string(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_canonical(&self) -> bool {
        *self == Self::canonical()
    }

    /// HTTPS clone URL on GitHub, used in remediation hints.
    pub fn https_url(&self) -> String {
        format!("https://github.com/{}/{}.git", self.owner, self.name)
    }
}

impl PartialEq for RepoId {
    fn eq(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for RepoId {}

impl Hash for RepoId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.to_ascii_lowercase().hash(state);
        self.name.to_ascii_lowercase().hash(state);
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl TryFrom<String> for RepoId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RepoId> for String {
    fn from(id: RepoId) -> Self {
        id.to_string()
    }
}

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// Exit code reported for a command killed by its timeout.
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Exit code reported for a command that could not be spawned.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Outcome of one external command. Any non-zero `code` is a failure,
/// whatever the captured output says.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StepResult {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl StepResult {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    /// Best available diagnostic: trimmed stderr, else trimmed stdout, else
    /// the bare exit code.
    pub fn diagnostic(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_string();
        }
        format!("exit code {}", self.code)
    }
}

// ---------------------------------------------------------------------------
// Pipeline options and smoke checks
// ---------------------------------------------------------------------------

/// Caller-supplied options for one update run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Restart the running gateway after the global install.
    pub restart: bool,
    /// Release channel; only meaningful for non-fork updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    /// Release tag; only meaningful for non-fork updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            restart: true,
            channel: None,
            tag: None,
        }
    }
}

impl PipelineOptions {
    /// Names of the informational flags that were supplied and will be
    /// ignored on the fork path.
    pub fn ignored_flags(&self) -> Vec<&'static str> {
        let mut flags = Vec::new();
        if self.channel.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            flags.push("channel");
        }
        if self.tag.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            flags.push("tag");
        }
        flags
    }
}

/// One post-install search query run against the freshly installed CLI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SmokeCheck {
    /// Agent whose memory index is searched.
    pub agent: String,
    pub query: String,
}

impl SmokeCheck {
    pub fn new(agent: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            query: query.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
