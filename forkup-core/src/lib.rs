//! forkup core library: domain types, build metadata, remote parsing, config.
//!
//! - [`types`]: [`RepoId`], [`StepResult`], [`PipelineOptions`]
//! - [`remote`]: `owner/repo` extraction from git remote URLs
//! - [`build_info`]: tolerant reader for `dist/build-info.json`
//! - [`config`]: [`UpdateConfig`] built once from an environment snapshot
//! - [`error`]: [`CoreError`]

pub mod build_info;
pub mod config;
pub mod error;
pub mod remote;
pub mod types;

pub use build_info::BuildInfo;
pub use config::{EnvSnapshot, UpdateConfig};
pub use error::CoreError;
pub use remote::parse_remote_url;
pub use types::{PipelineOptions, RepoId, SmokeCheck, StepResult, CANONICAL_REPO};
