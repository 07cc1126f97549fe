//! Fork update pipeline: the canonical entrypoint used by the CLI.
//!
//! Steps run strictly in order and the first failure aborts the run. Nothing
//! already applied (rebased history, pushed branch, global install) is rolled
//! back.

use std::path::{Path, PathBuf};

use forkup_core::{build_info, PipelineOptions, RepoId, UpdateConfig};
use serde::Serialize;

use crate::error::UpdateError;
use crate::identity::resolve_fork_identity;
use crate::locate::locate_fork_root;
use crate::pack::resolve_pack_destination;
use crate::runner::{CommandRunner, CommandSpec};
use crate::smoke::{count_matches, smoke_command, SmokeReport};
use crate::step::{StepName, StepRecord, StepRunner};
use crate::upstream::{add_remote_command, ensure_upstream_remote};

/// Result of [`update_fork`].
#[derive(Debug, Clone)]
pub enum ForkUpdate {
    /// The install tracks the canonical repository or no fork is configured.
    /// Nothing was touched.
    NotAFork,
    Updated(UpdateSummary),
}

/// What a successful run did.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateSummary {
    pub repo: RepoId,
    pub fork_root: PathBuf,
    pub artifact: PathBuf,
    pub restarted: bool,
    /// Informational options that were supplied but ignored.
    pub ignored_flags: Vec<String>,
    pub smoke: Vec<SmokeReport>,
    pub history: Vec<StepRecord>,
}

/// One line of `forkup plan` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    #[serde(flatten)]
    pub step: StepName,
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Resolve identity and fork root, then run the whole pipeline.
pub async fn update_fork(
    config: &UpdateConfig,
    runner: &dyn CommandRunner,
    options: &PipelineOptions,
) -> Result<ForkUpdate, UpdateError> {
    match prepare_fork_update(config, runner).await? {
        None => Ok(ForkUpdate::NotAFork),
        Some(mut pipeline) => pipeline.run(options).await.map(ForkUpdate::Updated),
    }
}

/// Read build metadata, resolve the fork identity, and locate its checkout.
///
/// `Ok(None)` means this install is not a fork. A fork whose checkout cannot
/// be found is [`UpdateError::ForkRootNotFound`].
pub async fn prepare_fork_update<'a>(
    config: &'a UpdateConfig,
    runner: &'a dyn CommandRunner,
) -> Result<Option<UpdatePipeline<'a>>, UpdateError> {
    let build_info = build_info::load_at(&config.install_root);
    let Some(repo) = resolve_fork_identity(config, &build_info)? else {
        tracing::info!(install_root = %config.install_root.display(), "install is not a fork");
        return Ok(None);
    };

    let root = locate_fork_root(
        runner,
        &repo,
        &config.candidate_roots(),
        &config.default_clone_dir(),
        config.probe_timeout,
    )
    .await?;
    Ok(Some(UpdatePipeline::new(config, runner, repo, root)))
}

/// A fork update bound to a located checkout.
pub struct UpdatePipeline<'a> {
    config: &'a UpdateConfig,
    repo: RepoId,
    root: PathBuf,
    steps: StepRunner<'a>,
}

impl<'a> UpdatePipeline<'a> {
    pub fn new(
        config: &'a UpdateConfig,
        runner: &'a dyn CommandRunner,
        repo: RepoId,
        root: PathBuf,
    ) -> Self {
        Self {
            config,
            repo,
            root,
            steps: StepRunner::new(runner, config.command_timeout),
        }
    }

    pub fn repo(&self) -> &RepoId {
        &self.repo
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Steps executed so far, including the failed one after an abort.
    pub fn history(&self) -> &[StepRecord] {
        self.steps.history()
    }

    /// Run every step in order, stopping at the first failure.
    pub async fn run(&mut self, options: &PipelineOptions) -> Result<UpdateSummary, UpdateError> {
        let ignored_flags: Vec<String> = options
            .ignored_flags()
            .into_iter()
            .map(str::to_string)
            .collect();
        if !ignored_flags.is_empty() {
            tracing::info!(flags = ?ignored_flags, "channel/tag options are ignored for fork installs");
        }
        tracing::info!(repo = %self.repo, root = %self.root.display(), "updating fork");

        self.preflight().await?;
        ensure_upstream_remote(
            &mut self.steps,
            &self.root,
            &self.config.upstream_remote,
            &self.config.upstream_url,
            self.config.probe_timeout,
        )
        .await?;

        self.run_command(StepName::Fetch, self.fetch_command()).await?;
        self.run_command(StepName::Checkout, self.checkout_command()).await?;
        self.run_command(StepName::Rebase, self.rebase_command()).await?;
        if self.config.push_enabled {
            self.run_command(StepName::Push, self.push_command()).await?;
        } else {
            self.steps.skip(StepName::Push, "push disabled by OPENCLAW_FORK_PUSH=0");
        }
        self.run_command(StepName::InstallDeps, self.install_deps_command()).await?;
        self.run_command(StepName::Build, self.build_command()).await?;

        let artifact = self.pack().await?;
        let install = self.global_install_command(&artifact);
        self.steps.run_step(StepName::GlobalInstall, &install).await?;

        let restarted = if options.restart {
            self.run_command(StepName::Restart, self.restart_command()).await?;
            true
        } else {
            self.steps.skip(StepName::Restart, "restart disabled");
            tracing::info!(
                "tip: run `{} gateway restart` to pick up the new build",
                self.config.cli_bin
            );
            false
        };

        let smoke = self.smoke_tests().await?;
        tracing::info!(repo = %self.repo, artifact = %artifact.display(), "fork update complete");

        Ok(UpdateSummary {
            repo: self.repo.clone(),
            fork_root: self.root.clone(),
            artifact,
            restarted,
            ignored_flags,
            smoke,
            history: self.steps.history().to_vec(),
        })
    }

    /// The steps [`run`](Self::run) would execute, without executing any.
    pub fn plan(&self, options: &PipelineOptions) -> Vec<PlannedStep> {
        let pack_dir = self.config.preferred_pack_dir();
        let artifact = pack_dir.join("<artifact>.tgz");

        let mut planned = Vec::new();
        let mut push = |step: StepName, spec: CommandSpec, note: Option<String>| {
            planned.push(PlannedStep {
                step,
                command: spec.to_string(),
                note,
            });
        };

        push(StepName::Preflight, self.status_command(), None);
        push(
            StepName::EnsureUpstream,
            add_remote_command(&self.root, &self.config.upstream_remote, &self.config.upstream_url),
            Some(format!("only if remote '{}' is missing", self.config.upstream_remote)),
        );
        push(StepName::Fetch, self.fetch_command(), None);
        push(StepName::Checkout, self.checkout_command(), None);
        push(StepName::Rebase, self.rebase_command(), None);
        push(
            StepName::Push,
            self.push_command(),
            (!self.config.push_enabled).then(|| "skipped: OPENCLAW_FORK_PUSH=0".to_string()),
        );
        push(StepName::InstallDeps, self.install_deps_command(), None);
        push(StepName::Build, self.build_command(), None);
        push(
            StepName::Pack,
            self.pack_command(&pack_dir),
            Some("falls back to a temp directory if needed".to_string()),
        );
        push(StepName::GlobalInstall, self.global_install_command(&artifact), None);
        push(
            StepName::Restart,
            self.restart_command(),
            (!options.restart).then(|| "skipped: restart disabled".to_string()),
        );
        for check in &self.config.smoke_checks {
            push(
                StepName::SmokeTest {
                    agent: check.agent.clone(),
                },
                smoke_command(&self.config.cli_bin, check),
                None,
            );
        }
        planned
    }

    async fn preflight(&mut self) -> Result<(), UpdateError> {
        let root = self.root.clone();
        let spec = self.status_command();
        self.steps
            .run_step_with(StepName::Preflight, &spec, |status| {
                let dirty = status.stdout.trim();
                if dirty.is_empty() {
                    return Ok(());
                }
                Err(UpdateError::DirtyWorkingTree {
                    path: root,
                    status: dirty.to_string(),
                })
            })
            .await?;
        Ok(())
    }

    async fn pack(&mut self) -> Result<PathBuf, UpdateError> {
        let pack_dir = resolve_pack_destination(self.config).await;
        let spec = self.pack_command(&pack_dir);
        let dir = pack_dir.clone();
        let packed = self
            .steps
            .run_step_with(StepName::Pack, &spec, |result| {
                match artifact_from_pack_output(&result.stdout) {
                    Some(_) => Ok(()),
                    None => Err(UpdateError::MissingArtifact { dir }),
                }
            })
            .await?;

        // The validator above guarantees a filename is present.
        let name = artifact_from_pack_output(&packed.stdout).unwrap_or_default();
        Ok(pack_dir.join(name))
    }

    async fn smoke_tests(&mut self) -> Result<Vec<SmokeReport>, UpdateError> {
        let mut reports = Vec::with_capacity(self.config.smoke_checks.len());
        for check in &self.config.smoke_checks {
            let step = StepName::SmokeTest {
                agent: check.agent.clone(),
            };
            let result = self
                .steps
                .run_step(step, &smoke_command(&self.config.cli_bin, check))
                .await?;
            let matches = count_matches(&result.stdout);
            if matches == Some(0) {
                tracing::warn!(agent = %check.agent, "smoke search returned no records");
            }
            reports.push(SmokeReport {
                agent: check.agent.clone(),
                matches,
            });
        }
        Ok(reports)
    }

    async fn run_command(&mut self, step: StepName, spec: CommandSpec) -> Result<(), UpdateError> {
        self.steps.run_step(step, &spec).await?;
        Ok(())
    }

    fn status_command(&self) -> CommandSpec {
        CommandSpec::git(["status", "--porcelain"]).in_dir(&self.root)
    }

    fn fetch_command(&self) -> CommandSpec {
        CommandSpec::git(["fetch", self.config.upstream_remote.as_str(), "--prune", "--tags"])
            .in_dir(&self.root)
    }

    fn checkout_command(&self) -> CommandSpec {
        CommandSpec::git(["checkout", self.config.branch.as_str()]).in_dir(&self.root)
    }

    fn rebase_command(&self) -> CommandSpec {
        CommandSpec::git(["rebase", self.config.upstream_ref.as_str()]).in_dir(&self.root)
    }

    fn push_command(&self) -> CommandSpec {
        CommandSpec::git(["push", "--force-with-lease", "origin", self.config.branch.as_str()])
            .in_dir(&self.root)
    }

    fn install_deps_command(&self) -> CommandSpec {
        CommandSpec::new("pnpm", ["install"]).in_dir(&self.root)
    }

    fn build_command(&self) -> CommandSpec {
        CommandSpec::new("pnpm", ["build"]).in_dir(&self.root)
    }

    /// Runs against the installed CLI, not the checkout.
    fn restart_command(&self) -> CommandSpec {
        CommandSpec::new(self.config.cli_bin.as_str(), ["gateway", "restart"])
    }

    fn pack_command(&self, pack_dir: &Path) -> CommandSpec {
        CommandSpec::new(
            "npm",
            [
                "pack".to_string(),
                "--pack-destination".to_string(),
                pack_dir.display().to_string(),
            ],
        )
        .in_dir(&self.root)
    }

    fn global_install_command(&self, artifact: &Path) -> CommandSpec {
        CommandSpec::new(
            "npm",
            [
                "install".to_string(),
                "-g".to_string(),
                "--force".to_string(),
                artifact.display().to_string(),
            ],
        )
    }
}

/// `npm pack` prints the tarball name as its last non-empty stdout line.
pub fn artifact_from_pack_output(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use forkup_core::StepResult;
    use std::time::Duration;

    use super::*;

    struct NeverRun;

    #[async_trait]
    impl CommandRunner for NeverRun {
        async fn run(&self, spec: &CommandSpec, _timeout: Duration) -> StepResult {
            panic!("plan must not execute {spec}");
        }
    }

    fn config(pairs: &[(&str, &str)]) -> UpdateConfig {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        UpdateConfig::from_snapshot(&env, PathBuf::from("/home/tester"))
    }

    #[test]
    fn artifact_is_last_non_empty_line() {
        let out = "npm notice package: openclaw@2026.1.5\nopenclaw-2026.1.5.tgz\n\n  \n";
        assert_eq!(
            artifact_from_pack_output(out).as_deref(),
            Some("openclaw-2026.1.5.tgz")
        );
        assert_eq!(artifact_from_pack_output("\n \n"), None);
    }

    #[test]
    fn plan_lists_every_stage_in_order_without_running() {
        let config = config(&[("OPENCLAW_PACK_DIR", "/var/packs")]);
        let pipeline = UpdatePipeline::new(
            &config,
            &NeverRun,
            RepoId::parse("ThomasMarcelis/openclaw").unwrap(),
            PathBuf::from("/home/tester/openclaw"),
        );
        let plan = pipeline.plan(&PipelineOptions::default());
        let steps: Vec<String> = plan.iter().map(|p| p.step.to_string()).collect();
        assert_eq!(
            steps,
            vec![
                "preflight (clean working tree)",
                "ensure upstream remote",
                "git fetch",
                "git checkout",
                "git rebase",
                "git push",
                "install dependencies",
                "build",
                "pack",
                "global install",
                "gateway restart",
                "smoke test (main)",
                "smoke test (ops)",
            ]
        );
        assert_eq!(plan[4].command, "git rebase upstream/main");
        assert_eq!(
            plan[5].command,
            "git push --force-with-lease origin jd-bot-effectiveness-fixes"
        );
        assert_eq!(plan[8].command, "npm pack --pack-destination /var/packs/fork-pack");
        assert!(plan.iter().all(|p| p.note.as_deref() != Some("skipped: restart disabled")));
    }

    #[test]
    fn plan_notes_disabled_push_and_restart() {
        let config = config(&[("OPENCLAW_FORK_PUSH", "0")]);
        let pipeline = UpdatePipeline::new(
            &config,
            &NeverRun,
            RepoId::parse("ThomasMarcelis/openclaw").unwrap(),
            PathBuf::from("/home/tester/openclaw"),
        );
        let plan = pipeline.plan(&PipelineOptions {
            restart: false,
            ..PipelineOptions::default()
        });
        let push = plan.iter().find(|p| p.step == StepName::Push).unwrap();
        assert_eq!(push.note.as_deref(), Some("skipped: OPENCLAW_FORK_PUSH=0"));
        let restart = plan.iter().find(|p| p.step == StepName::Restart).unwrap();
        assert_eq!(restart.note.as_deref(), Some("skipped: restart disabled"));
    }
}
