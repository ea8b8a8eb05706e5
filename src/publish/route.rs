//! Routing spool entries to date-partitioned log files.
//!
//! Each entry's leading timestamp line names the UTC day whose file it
//! belongs to. The repo-root `now` link tracks the single open day; an
//! entry for a later day closes the current one through the rollover
//! engine before the link is re-pointed. Entries dated before the open day
//! are appended to the open day anyway: receipt order is the source of
//! truth, not timestamp fidelity.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::git::rollover::{self, NOW_LINK};
use crate::git::CommitIdentity;
use crate::types::LogDate;

use super::{PublishError, Result};

/// How many leading bytes of a spool entry are searched for the timestamp
/// line.
pub const TIMESTAMP_READ_LIMIT: usize = 8192;

/// Routes spool entries into one repository working tree.
#[derive(Debug)]
pub struct Router {
    repo: PathBuf,
    identity: CommitIdentity,
}

impl Router {
    pub fn new(repo: &Path, identity: CommitIdentity) -> Router {
        Router {
            repo: repo.to_path_buf(),
            identity,
        }
    }

    /// Integrates one spool entry into the repository.
    ///
    /// The caller (the drainer) unlinks the entry afterwards.
    pub fn integrate(&mut self, spool_file: &Path) -> Result<()> {
        let date = entry_date(spool_file)?;
        let contents = fs::read(spool_file)?;
        let filename = date.encode();
        // The strict decoder must agree with the encoder on every name we
        // are about to create.
        let decoded = LogDate::decode(&filename)?;
        debug_assert_eq!(decoded, date);

        match self.read_now()? {
            None => {
                debug!(day = %filename, "opening first day");
                self.point_now(&filename)?;
                self.append(&filename, &contents)?;
            }
            Some(current) if current == filename => {
                self.append(&filename, &contents)?;
            }
            Some(current) => {
                let current_date = LogDate::decode(&current)?;
                if date > current_date {
                    info!(closed = %current, opened = %filename, "day rollover");
                    rollover::close_day(&self.repo, &self.identity, &current)?;
                    self.point_now(&filename)?;
                    self.append(&filename, &contents)?;
                } else {
                    // Ordering wins over the stamp: keep the entry in the
                    // open day rather than reopening a closed one.
                    warn!(
                        entry = %date,
                        open_day = %current,
                        "entry dated before the open day, appending to it"
                    );
                    self.append(&current, &contents)?;
                }
            }
        }
        Ok(())
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn identity(&self) -> &CommitIdentity {
        &self.identity
    }

    /// Reads the `now` link, or `None` when it does not exist.
    fn read_now(&self) -> Result<Option<String>> {
        match fs::read_link(self.repo.join(NOW_LINK)) {
            Ok(target) => Ok(Some(target.to_string_lossy().into_owned())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn point_now(&self, filename: &str) -> Result<()> {
        std::os::unix::fs::symlink(filename, self.repo.join(NOW_LINK))?;
        Ok(())
    }

    /// Appends the raw entry plus the `\n\n` record terminator.
    fn append(&self, filename: &str, contents: &[u8]) -> Result<()> {
        let target = self.repo.join(filename);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().append(true).create(true).open(&target)?;
        file.write_all(contents)?;
        file.write_all(b"\n\n")?;
        Ok(())
    }
}

/// Parses the leading timestamp line of a spool entry into its UTC day.
///
/// Reads at most [`TIMESTAMP_READ_LIMIT`] bytes of the file; the timestamp
/// line must end within that window.
fn entry_date(path: &Path) -> Result<LogDate> {
    let mut window = Vec::new();
    File::open(path)?
        .take(TIMESTAMP_READ_LIMIT as u64)
        .read_to_end(&mut window)?;
    let newline = window.iter().position(|&b| b == b'\n').ok_or_else(|| {
        PublishError::FileHasNoNewline {
            path: path.to_path_buf(),
            limit: TIMESTAMP_READ_LIMIT,
        }
    })?;
    let line = String::from_utf8_lossy(&window[..newline]).into_owned();
    let invalid = |line: String| PublishError::FileHasInvalidTimestamp {
        path: path.to_path_buf(),
        line,
    };
    let secs: u64 = line.parse().map_err(|_| invalid(line.clone()))?;
    LogDate::from_epoch(secs).ok_or_else(|| invalid(line))
}
