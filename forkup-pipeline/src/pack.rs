//! Pack destination resolution.
//!
//! The resolver walks an ordered list of strategies and returns the first
//! directory that exists and accepts writes. It never fails the pipeline:
//! when every strategy fails the temp fallback path is returned as-is and the
//! packer itself reports the problem.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use forkup_core::UpdateConfig;
use thiserror::Error;

const WRITE_PROBE: &str = ".forkup-write-probe";

/// A candidate location for packed artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackStrategy {
    /// `<OPENCLAW_PACK_DIR or ~/.openclaw>/fork-pack`.
    Preferred(PathBuf),
    /// `<temp>/openclaw-fork-pack`.
    TempFallback(PathBuf),
}

impl PackStrategy {
    pub fn path(&self) -> &Path {
        match self {
            PackStrategy::Preferred(path) | PackStrategy::TempFallback(path) => path,
        }
    }
}

/// Why a strategy's directory could not be used.
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("creating {path} timed out")]
    TimedOut { path: PathBuf },

    #[error("{path} does not exist after create: {source}")]
    Missing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path} is not writable: {source}")]
    NotWritable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Strategies in priority order.
pub fn pack_strategies(config: &UpdateConfig) -> Vec<PackStrategy> {
    vec![
        PackStrategy::Preferred(config.preferred_pack_dir()),
        PackStrategy::TempFallback(config.pack_fallback_dir.clone()),
    ]
}

/// Pick a directory for `npm pack` output. Always returns a path.
pub async fn resolve_pack_destination(config: &UpdateConfig) -> PathBuf {
    let strategies = pack_strategies(config);
    for strategy in &strategies {
        match prepare_dir(strategy.path(), config.fs_timeout).await {
            Ok(()) => {
                tracing::debug!(path = %strategy.path().display(), "pack destination ready");
                return strategy.path().to_path_buf();
            }
            Err(err) => {
                tracing::warn!(error = %err, "pack destination unavailable, trying next");
            }
        }
    }
    config.pack_fallback_dir.clone()
}

/// Create `dir` (creation errors are tolerated), then require that it exists
/// and accepts a probe file.
pub async fn prepare_dir(dir: &Path, timeout: Duration) -> Result<(), PrepareError> {
    let attempt = async {
        if let Err(err) = tokio::fs::create_dir_all(dir).await {
            tracing::debug!(path = %dir.display(), error = %err, "create_dir_all failed");
        }

        let metadata = tokio::fs::metadata(dir)
            .await
            .map_err(|source| PrepareError::Missing {
                path: dir.to_path_buf(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(PrepareError::Missing {
                path: dir.to_path_buf(),
                source: io::Error::other("not a directory"),
            });
        }

        let probe = dir.join(WRITE_PROBE);
        tokio::fs::write(&probe, b"")
            .await
            .map_err(|source| PrepareError::NotWritable {
                path: dir.to_path_buf(),
                source,
            })?;
        let _ = tokio::fs::remove_file(&probe).await;
        Ok(())
    };

    tokio::time::timeout(timeout, attempt)
        .await
        .unwrap_or_else(|_| {
            Err(PrepareError::TimedOut {
                path: dir.to_path_buf(),
            })
        })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use forkup_core::config::ENV_PACK_DIR;
    use tempfile::TempDir;

    use super::*;

    fn config_with(pack_base: &Path, fallback: &Path) -> UpdateConfig {
        let mut env = HashMap::new();
        env.insert(ENV_PACK_DIR.to_string(), pack_base.display().to_string());
        let mut config = UpdateConfig::from_snapshot(&env, PathBuf::from("/home/tester"));
        config.pack_fallback_dir = fallback.to_path_buf();
        config
    }

    #[tokio::test]
    async fn preferred_directory_is_created_under_base() {
        let base = TempDir::new().expect("base");
        let fallback = TempDir::new().expect("fallback");
        let config = config_with(base.path(), &fallback.path().join("pack"));

        let dest = resolve_pack_destination(&config).await;
        assert_eq!(dest, base.path().join("fork-pack"));
        assert!(dest.is_dir());
        assert!(!dest.join(WRITE_PROBE).exists());
    }

    #[tokio::test]
    async fn falls_back_when_base_cannot_hold_directories() {
        let scratch = TempDir::new().expect("scratch");
        let blocker = scratch.path().join("not-a-dir");
        std::fs::write(&blocker, "file").expect("write blocker");
        let fallback = scratch.path().join("tmp-pack");
        let config = config_with(&blocker, &fallback);

        let dest = resolve_pack_destination(&config).await;
        assert_eq!(dest, fallback);
        assert!(dest.is_dir());
        std::fs::write(dest.join("artifact.tgz"), b"x").expect("destination writable");
    }

    #[test]
    fn strategies_are_ordered_preferred_then_temp() {
        let config = config_with(Path::new("/var/packs"), Path::new("/tmp/openclaw-fork-pack"));
        assert_eq!(
            pack_strategies(&config),
            vec![
                PackStrategy::Preferred(PathBuf::from("/var/packs/fork-pack")),
                PackStrategy::TempFallback(PathBuf::from("/tmp/openclaw-fork-pack")),
            ]
        );
    }
}
