pub mod plan;
pub mod status;
pub mod update;

use anyhow::{Context, Result};
use forkup_core::UpdateConfig;
use forkup_pipeline::UpdateError;

/// Resolve configuration from the process environment.
pub(crate) fn load_config() -> Result<UpdateConfig> {
    UpdateConfig::from_env().context("failed to resolve update configuration")
}

/// A missing fork checkout carries its own remediation text; print it as-is
/// and exit 1 instead of wrapping it in an anyhow chain.
pub(crate) fn exit_if_fork_root_missing(err: UpdateError) -> UpdateError {
    if let UpdateError::ForkRootNotFound { .. } = err {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    err
}
