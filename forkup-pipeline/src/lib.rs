//! # forkup-pipeline
//!
//! Fork update orchestration.
//!
//! Call [`update_fork`] to resolve the fork identity, locate its checkout and
//! run every step, or [`prepare_fork_update`] to get an [`UpdatePipeline`]
//! whose history and plan can be inspected around the run.

pub mod error;
pub mod identity;
pub mod locate;
pub mod pack;
pub mod pipeline;
pub mod runner;
pub mod smoke;
pub mod step;
pub mod upstream;

pub use error::UpdateError;
pub use identity::resolve_fork_identity;
pub use locate::locate_fork_root;
pub use pack::resolve_pack_destination;
pub use pipeline::{
    prepare_fork_update, update_fork, ForkUpdate, PlannedStep, UpdatePipeline, UpdateSummary,
};
pub use runner::{CommandRunner, CommandSpec, ProcessRunner};
pub use smoke::SmokeReport;
pub use step::{StepName, StepOutcome, StepRecord, StepRunner};
