//! `forkup status`: what this install was built from and where its fork lives.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;

use forkup_core::{build_info, BuildInfo, UpdateConfig};
use forkup_pipeline::{locate_fork_root, resolve_fork_identity, ProcessRunner};

use super::load_config;

/// Arguments for `forkup status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct StatusReport {
    install_root: PathBuf,
    build_info_present: bool,
    version: Option<String>,
    commit: Option<String>,
    built_at: Option<String>,
    source_repo: Option<String>,
    /// Resolved fork identity; `None` when the install is not a fork.
    fork: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fork_error: Option<String>,
    fork_root: Option<PathBuf>,
    /// Why the checkout could not be located.
    #[serde(skip_serializing_if = "Option::is_none")]
    fork_root_error: Option<String>,
    upstream_ref: String,
    branch: String,
    push_enabled: bool,
}

impl StatusArgs {
    pub async fn run(self) -> Result<()> {
        let config = load_config()?;
        let report = build_report(&config).await;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&report).context("failed to serialize status JSON")?
            );
            return Ok(());
        }

        print_report(&report, Utc::now());
        Ok(())
    }
}

async fn build_report(config: &UpdateConfig) -> StatusReport {
    let info: BuildInfo = build_info::load_at(&config.install_root);
    let (fork, fork_error) = match resolve_fork_identity(config, &info) {
        Ok(fork) => (fork, None),
        Err(err) => (None, Some(err.to_string())),
    };

    let (fork_root, fork_root_error) = match &fork {
        Some(repo) => match locate_fork_root(
            &ProcessRunner,
            repo,
            &config.candidate_roots(),
            &config.default_clone_dir(),
            config.probe_timeout,
        )
        .await
        {
            Ok(root) => (Some(root), None),
            Err(err) => (None, Some(err.to_string())),
        },
        None => (None, None),
    };

    StatusReport {
        install_root: config.install_root.clone(),
        build_info_present: !info.is_empty(),
        built_at: info.built_at_utc().map(|at| at.to_rfc3339()),
        version: info.version,
        commit: info.commit,
        source_repo: info.source_repo,
        fork: fork.map(|repo| repo.to_string()),
        fork_error,
        fork_root,
        fork_root_error,
        upstream_ref: config.upstream_ref.clone(),
        branch: config.branch.clone(),
        push_enabled: config.push_enabled,
    }
}

fn print_report(report: &StatusReport, now: DateTime<Utc>) {
    println!(
        "forkup v{} | install {}",
        env!("CARGO_PKG_VERSION"),
        report.install_root.display()
    );

    if report.build_info_present {
        let built = report
            .built_at
            .as_deref()
            .and_then(|at| DateTime::parse_from_rfc3339(at).ok())
            .map(|at| format_age(at.with_timezone(&Utc), now))
            .unwrap_or_else(|| "unknown".to_string());
        println!(
            "  version {} | commit {} | built {built}",
            report.version.as_deref().unwrap_or("unknown"),
            report.commit.as_deref().map(short_commit).unwrap_or("unknown"),
        );
    } else {
        println!("  no build metadata found");
    }

    if let Some(err) = &report.fork_error {
        println!("fork identity unresolved: {err}");
        return;
    }
    let Some(fork) = report.fork.as_deref() else {
        println!("Not a fork install; `forkup update` has nothing to do.");
        return;
    };

    println!("fork {fork} | branch {} | rebase onto {}", report.branch, report.upstream_ref);
    match (&report.fork_root, &report.fork_root_error) {
        (Some(root), _) => println!("  checkout {}", root.display()),
        (None, Some(err)) => println!("  checkout not found: {err}"),
        (None, None) => {}
    }
    if !report.push_enabled {
        println!("  push disabled (OPENCLAW_FORK_PUSH=0)");
    }
}

fn short_commit(commit: &str) -> &str {
    commit.get(..7).unwrap_or(commit)
}

/// Coarse human age: `just now`, `5m ago`, `3h ago`, `2d ago`.
fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - at).num_seconds();
    match secs {
        s if s < 60 => "just now".to_string(),
        s if s < 3_600 => format!("{}m ago", s / 60),
        s if s < 86_400 => format!("{}h ago", s / 3_600),
        s => format!("{}d ago", s / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn age_buckets() {
        let now = Utc.with_ymd_and_hms(2026, 1, 5, 12, 0, 0).unwrap();
        assert_eq!(format_age(now, now), "just now");
        assert_eq!(format_age(now - chrono::Duration::minutes(5), now), "5m ago");
        assert_eq!(format_age(now - chrono::Duration::hours(3), now), "3h ago");
        assert_eq!(format_age(now - chrono::Duration::days(2), now), "2d ago");
    }

    #[test]
    fn commit_is_shortened_when_long() {
        assert_eq!(short_commit("0123456789abcdef"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
    }
}
