//! Update configuration, resolved once per run from an environment snapshot.
//!
//! Components never read process environment themselves; they receive a
//! `&UpdateConfig`. Tests build snapshots directly.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::CoreError;
use crate::types::SmokeCheck;

/// A copy of the process environment taken at startup.
pub type EnvSnapshot = HashMap<String, String>;

pub const ENV_FORK_REPO: &str = "OPENCLAW_FORK_REPO";
pub const ENV_FORK_ROOT: &str = "OPENCLAW_FORK_ROOT";
pub const ENV_UPSTREAM_REMOTE: &str = "OPENCLAW_UPSTREAM_REMOTE";
pub const ENV_UPSTREAM_REF: &str = "OPENCLAW_UPSTREAM_REF";
pub const ENV_UPSTREAM_URL: &str = "OPENCLAW_UPSTREAM_URL";
pub const ENV_FORK_PUSH: &str = "OPENCLAW_FORK_PUSH";
pub const ENV_FORK_BRANCH: &str = "OPENCLAW_FORK_BRANCH";
pub const ENV_PACK_DIR: &str = "OPENCLAW_PACK_DIR";
pub const ENV_INSTALL_ROOT: &str = "OPENCLAW_INSTALL_ROOT";
pub const ENV_CLI_BIN: &str = "OPENCLAW_BIN";
pub const ENV_STEP_TIMEOUT: &str = "FORKUP_STEP_TIMEOUT_SECS";
pub const ENV_PROBE_TIMEOUT: &str = "FORKUP_PROBE_TIMEOUT_SECS";

pub const DEFAULT_UPSTREAM_REMOTE: &str = "upstream";
pub const DEFAULT_UPSTREAM_URL: &str = "https://github.com/openclaw/openclaw.git";
pub const DEFAULT_FORK_BRANCH: &str = "jd-bot-effectiveness-fixes";
pub const DEFAULT_CLI_BIN: &str = "openclaw";
pub const PACK_SUBDIR: &str = "fork-pack";
pub const PACK_FALLBACK_DIR: &str = "openclaw-fork-pack";

const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(20 * 60);
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_FS_TIMEOUT: Duration = Duration::from_secs(5);

/// Everything the fork-update pipeline needs to know about its environment.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    pub home: PathBuf,
    /// Explicit fork identifier; used verbatim ahead of build metadata.
    pub fork_repo_override: Option<String>,
    /// Explicit checkout location; always probed first.
    pub fork_root_override: Option<PathBuf>,
    pub upstream_remote: String,
    pub upstream_ref: String,
    pub upstream_url: String,
    pub push_enabled: bool,
    pub branch: String,
    /// Operator-chosen base for packed artifacts (`<base>/fork-pack`).
    pub pack_base_dir: Option<PathBuf>,
    /// Last-resort pack directory under the system temp dir.
    pub pack_fallback_dir: PathBuf,
    /// Root of the installed package holding `dist/build-info.json`.
    pub install_root: PathBuf,
    /// CLI invoked for gateway restart and smoke checks.
    pub cli_bin: String,
    pub command_timeout: Duration,
    pub probe_timeout: Duration,
    pub fs_timeout: Duration,
    pub smoke_checks: Vec<SmokeCheck>,
}

impl UpdateConfig {
    /// Snapshot the process environment and resolve the home directory.
    pub fn from_env() -> Result<Self, CoreError> {
        let env: EnvSnapshot = std::env::vars().collect();
        let home = dirs::home_dir().ok_or(CoreError::HomeNotFound)?;
        Ok(Self::from_snapshot(&env, home))
    }

    /// Build the configuration from an explicit snapshot.
    pub fn from_snapshot(env: &EnvSnapshot, home: PathBuf) -> Self {
        let upstream_remote = non_empty(env, ENV_UPSTREAM_REMOTE)
            .unwrap_or_else(|| DEFAULT_UPSTREAM_REMOTE.to_string());
        let upstream_ref =
            non_empty(env, ENV_UPSTREAM_REF).unwrap_or_else(|| format!("{upstream_remote}/main"));
        let cli_bin = non_empty(env, ENV_CLI_BIN).unwrap_or_else(|| DEFAULT_CLI_BIN.to_string());

        let temp_base = non_empty(env, "TMPDIR")
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir);

        let install_root = non_empty(env, ENV_INSTALL_ROOT)
            .map(PathBuf::from)
            .or_else(|| installed_package_root(&cli_bin, env.get("PATH").map(String::as_str)))
            .unwrap_or_else(|| home.join(".openclaw"));

        Self {
            fork_repo_override: non_empty(env, ENV_FORK_REPO),
            fork_root_override: non_empty(env, ENV_FORK_ROOT).map(PathBuf::from),
            upstream_url: non_empty(env, ENV_UPSTREAM_URL)
                .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string()),
            push_enabled: env
                .get(ENV_FORK_PUSH)
                .map(|value| value.trim() != "0")
                .unwrap_or(true),
            branch: non_empty(env, ENV_FORK_BRANCH)
                .unwrap_or_else(|| DEFAULT_FORK_BRANCH.to_string()),
            pack_base_dir: non_empty(env, ENV_PACK_DIR).map(PathBuf::from),
            pack_fallback_dir: temp_base.join(PACK_FALLBACK_DIR),
            install_root,
            command_timeout: seconds(env, ENV_STEP_TIMEOUT).unwrap_or(DEFAULT_STEP_TIMEOUT),
            probe_timeout: seconds(env, ENV_PROBE_TIMEOUT).unwrap_or(DEFAULT_PROBE_TIMEOUT),
            fs_timeout: DEFAULT_FS_TIMEOUT,
            smoke_checks: default_smoke_checks(),
            upstream_remote,
            upstream_ref,
            cli_bin,
            home,
        }
    }

    /// Checkout locations to probe, in priority order. The override comes
    /// first; duplicates keep their first position.
    pub fn candidate_roots(&self) -> Vec<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(root) = &self.fork_root_override {
            candidates.push(root.clone());
        }
        for default in [self.default_clone_dir(), self.home.join("src").join("openclaw")] {
            if !candidates.contains(&default) {
                candidates.push(default);
            }
        }
        candidates
    }

    /// Conventional checkout location, suggested when no fork root is found.
    pub fn default_clone_dir(&self) -> PathBuf {
        self.home.join("openclaw")
    }

    /// Preferred pack directory: `<OPENCLAW_PACK_DIR or ~/.openclaw>/fork-pack`.
    pub fn preferred_pack_dir(&self) -> PathBuf {
        self.pack_base_dir
            .clone()
            .unwrap_or_else(|| self.home.join(".openclaw"))
            .join(PACK_SUBDIR)
    }
}

fn default_smoke_checks() -> Vec<SmokeCheck> {
    vec![
        SmokeCheck::new("main", "openclaw"),
        SmokeCheck::new("ops", "gateway"),
    ]
}

fn non_empty(env: &EnvSnapshot, key: &str) -> Option<String> {
    env.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn seconds(env: &EnvSnapshot, key: &str) -> Option<Duration> {
    non_empty(env, key)
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Follow the CLI executable on `PATH` through its symlink; the package root
/// is the directory holding the resolved entry script.
fn installed_package_root(cli_bin: &str, path_var: Option<&str>) -> Option<PathBuf> {
    let path_var = path_var?;
    std::env::split_paths(path_var)
        .map(|dir| dir.join(cli_bin))
        .find(|candidate| candidate.is_file())
        .and_then(|bin| std::fs::canonicalize(bin).ok())
        .and_then(|resolved| resolved.parent().map(Path::to_path_buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(pairs: &[(&str, &str)]) -> EnvSnapshot {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn home() -> PathBuf {
        PathBuf::from("/home/tester")
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = UpdateConfig::from_snapshot(&snapshot(&[("PATH", "")]), home());
        assert_eq!(config.upstream_remote, "upstream");
        assert_eq!(config.upstream_ref, "upstream/main");
        assert_eq!(config.upstream_url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.branch, "jd-bot-effectiveness-fixes");
        assert!(config.push_enabled);
        assert_eq!(config.fork_repo_override, None);
        assert_eq!(config.install_root, home().join(".openclaw"));
        assert_eq!(config.smoke_checks.len(), 2);
        assert_ne!(config.smoke_checks[0].agent, config.smoke_checks[1].agent);
        assert_ne!(config.smoke_checks[0].query, config.smoke_checks[1].query);
    }

    #[test]
    fn upstream_ref_follows_custom_remote_name() {
        let config = UpdateConfig::from_snapshot(
            &snapshot(&[(ENV_UPSTREAM_REMOTE, "canonical")]),
            home(),
        );
        assert_eq!(config.upstream_ref, "canonical/main");

        let explicit = UpdateConfig::from_snapshot(
            &snapshot(&[(ENV_UPSTREAM_REMOTE, "canonical"), (ENV_UPSTREAM_REF, "canonical/next")]),
            home(),
        );
        assert_eq!(explicit.upstream_ref, "canonical/next");
    }

    #[test]
    fn push_is_disabled_only_by_zero() {
        let off = UpdateConfig::from_snapshot(&snapshot(&[(ENV_FORK_PUSH, "0")]), home());
        assert!(!off.push_enabled);
        for value in ["1", "false", "", "no"] {
            let config = UpdateConfig::from_snapshot(&snapshot(&[(ENV_FORK_PUSH, value)]), home());
            assert!(config.push_enabled, "value {value:?} should keep push on");
        }
    }

    #[test]
    fn blank_overrides_are_ignored() {
        let config = UpdateConfig::from_snapshot(
            &snapshot(&[(ENV_FORK_REPO, "   "), (ENV_FORK_ROOT, "")]),
            home(),
        );
        assert_eq!(config.fork_repo_override, None);
        assert_eq!(config.fork_root_override, None);
    }

    #[test]
    fn override_root_is_probed_first_and_deduplicated() {
        let config = UpdateConfig::from_snapshot(
            &snapshot(&[(ENV_FORK_ROOT, "/home/tester/openclaw")]),
            home(),
        );
        assert_eq!(
            config.candidate_roots(),
            vec![
                PathBuf::from("/home/tester/openclaw"),
                PathBuf::from("/home/tester/src/openclaw"),
            ]
        );

        let custom =
            UpdateConfig::from_snapshot(&snapshot(&[(ENV_FORK_ROOT, "/work/claw")]), home());
        assert_eq!(custom.candidate_roots()[0], PathBuf::from("/work/claw"));
        assert_eq!(custom.candidate_roots().len(), 3);
    }

    #[test]
    fn pack_dir_uses_override_base_plus_fixed_subdir() {
        let config =
            UpdateConfig::from_snapshot(&snapshot(&[(ENV_PACK_DIR, "/var/packs")]), home());
        assert_eq!(config.preferred_pack_dir(), PathBuf::from("/var/packs/fork-pack"));

        let default = UpdateConfig::from_snapshot(&snapshot(&[]), home());
        assert_eq!(
            default.preferred_pack_dir(),
            PathBuf::from("/home/tester/.openclaw/fork-pack")
        );
    }

    #[cfg(unix)]
    #[test]
    fn install_root_follows_cli_symlink_on_path() {
        let scratch = tempfile::TempDir::new().expect("scratch");
        let package = scratch.path().join("lib/node_modules/openclaw");
        let bin_dir = scratch.path().join("bin");
        std::fs::create_dir_all(&package).expect("mkdir package");
        std::fs::create_dir_all(&bin_dir).expect("mkdir bin");
        std::fs::write(package.join("openclaw.mjs"), "#!/usr/bin/env node\n").expect("entry");
        std::os::unix::fs::symlink(package.join("openclaw.mjs"), bin_dir.join("openclaw"))
            .expect("symlink");

        let path_var = bin_dir.display().to_string();
        let config = UpdateConfig::from_snapshot(&snapshot(&[("PATH", path_var.as_str())]), home());
        assert_eq!(
            config.install_root,
            std::fs::canonicalize(&package).expect("canonical package dir")
        );

        let explicit = UpdateConfig::from_snapshot(
            &snapshot(&[("PATH", path_var.as_str()), (ENV_INSTALL_ROOT, "/opt/openclaw")]),
            home(),
        );
        assert_eq!(explicit.install_root, PathBuf::from("/opt/openclaw"));
    }

    #[test]
    fn unparseable_timeouts_fall_back_to_defaults() {
        let config = UpdateConfig::from_snapshot(
            &snapshot(&[(ENV_STEP_TIMEOUT, "soon"), (ENV_PROBE_TIMEOUT, "3")]),
            home(),
        );
        assert_eq!(config.command_timeout, DEFAULT_STEP_TIMEOUT);
        assert_eq!(config.probe_timeout, Duration::from_secs(3));
    }
}
