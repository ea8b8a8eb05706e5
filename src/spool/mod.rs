//! The spool directory shared by logger and publisher.
//!
//! Each captured message is one file named by its decimal sequence number,
//! containing `<timestamp>\n<sender>\n<body>`. Files carry a `.partial`
//! suffix while being written; the rename to the final name is the
//! publication commit point, after which any observer may consume and
//! remove the file.

pub mod drain;
pub mod writer;

use std::ffi::OsString;
use std::io;

use thiserror::Error;

/// Suffix of spool files still being written.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Errors from spool operations.
#[derive(Debug, Error)]
pub enum SpoolError {
    /// A spool directory entry is not a sequence number.
    #[error("invalid filename {0:?} in spool directory")]
    InvalidFilenameInOutDir(OsString),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for spool operations.
pub type Result<T> = std::result::Result<T, SpoolError>;
