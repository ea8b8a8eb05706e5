//! IRC channel logger and Git publication pipeline.
//!
//! Two cooperating processes share a spool directory:
//!
//! - `irc-logger` holds a TLS connection to an IRC server, joins one channel,
//!   and writes every channel message as a numbered spool file.
//! - `irc-publisher` watches the spool, appends messages to date-partitioned
//!   log files in a Git working tree, force-pushes a `live` branch after every
//!   drain, and folds each completed day into a single `master` commit.
//!
//! This library provides the domain types and logic; the binaries under
//! `src/bin/` are thin CLI wrappers.

pub mod clock;
pub mod git;
pub mod irc;
pub mod publish;
pub mod spool;
pub mod types;
