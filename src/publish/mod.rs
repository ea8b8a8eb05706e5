//! Publisher-side integration of spool entries into the Git repository.
//!
//! [`route`] decides which day file an entry belongs to and maintains the
//! `now` link; [`watcher`] is the long-running loop that drains the spool
//! on every filesystem notification and publishes the results.

pub mod route;
pub mod watcher;

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::git::rollover::RolloverError;
use crate::git::GitError;
use crate::spool::SpoolError;
use crate::types::DateNameError;

/// Errors from the publisher pipeline.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Spool scanning or unlinking failed.
    #[error("spool error: {0}")]
    Spool(#[from] SpoolError),

    /// A git invocation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),

    /// The day rollover sequence failed.
    #[error("rollover error: {0}")]
    Rollover(#[from] RolloverError),

    /// A log filename (from the `now` link or the encoder) failed to decode.
    #[error("invalid repo date filename: {0}")]
    InvalidRepoDateFilename(#[from] DateNameError),

    /// A spool entry's timestamp line never ended.
    #[error("spool entry {path:?} has no newline in its first {limit} bytes")]
    FileHasNoNewline { path: PathBuf, limit: usize },

    /// A spool entry's first line is not an epoch-seconds timestamp.
    #[error("spool entry {path:?} has invalid timestamp line {line:?}")]
    FileHasInvalidTimestamp { path: PathBuf, line: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The filesystem watch failed.
    #[error("filesystem watch error: {0}")]
    Watch(#[from] notify::Error),

    /// The filesystem watch channel closed unexpectedly.
    #[error("filesystem watcher stopped delivering events")]
    WatchClosed,
}

/// Result type for publisher operations.
pub type Result<T> = std::result::Result<T, PublishError>;
