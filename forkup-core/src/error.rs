//! Error types for forkup-core.

use thiserror::Error;

/// Errors raised while building domain values or configuration.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A repository identifier was not of the form `owner/repo`.
    #[error("invalid repository identifier '{value}'; expected owner/repo")]
    InvalidRepoId { value: String },

    /// `dirs::home_dir()` returned `None`, so default checkout and pack
    /// locations cannot be derived.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
