//! Porcelain status snapshots and the admissible repo shapes.
//!
//! Between commits the publisher's working tree may only ever mention two
//! paths: the `now` link and the currently open day file. A status line for
//! anything else means the repository has been touched from outside and the
//! process must stop rather than commit an unknown state.

use std::path::Path;

use thiserror::Error;

use super::{run_captured, GitError};

/// Errors from taking or validating a status snapshot.
#[derive(Debug, Error)]
pub enum StatusError {
    /// A path outside the admissible set appeared in `git status`.
    #[error("unexpected repo state: stray path {path:?} in git status")]
    UnexpectedRepoState { path: String },

    /// A status line did not have the porcelain shape.
    #[error("unexpected repo state: unparsable status line {line:?}")]
    MalformedStatusLine { line: String },

    /// The underlying git invocation failed.
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

/// State of the `now` link in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NowState {
    /// Not mentioned by status.
    Missing,
    /// Present but untracked (`??`).
    Untracked,
    /// Staged or otherwise known to the index.
    Tracked,
}

/// A validated snapshot of `git status --porcelain`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepoStatus {
    /// State of the `now` link.
    pub now: NowState,
    /// Whether the open day file appeared in the status at all.
    pub day_file_listed: bool,
}

/// Takes a porcelain snapshot and checks it against the admissible set
/// `{now_link, day_file}`.
///
/// `--untracked-files=all` is passed so a day file inside a not-yet-tracked
/// year directory is reported by path rather than collapsed to `YYYY/`.
pub fn snapshot(repo: &Path, now_link: &str, day_file: &str) -> Result<RepoStatus, StatusError> {
    let output = run_captured(repo, &["status", "--porcelain", "--untracked-files=all"])?;
    let text = String::from_utf8_lossy(&output.stdout).to_string();

    let mut now = NowState::Missing;
    let mut day_file_listed = false;

    for line in text.lines() {
        let (code, rest) = split_status_line(line)?;
        // Rename lines carry both sides of the move.
        for path in rest.split(" -> ") {
            if path == now_link {
                now = if code == "??" {
                    NowState::Untracked
                } else {
                    NowState::Tracked
                };
            } else if path == day_file {
                day_file_listed = true;
            } else {
                return Err(StatusError::UnexpectedRepoState {
                    path: path.to_string(),
                });
            }
        }
    }

    Ok(RepoStatus {
        now,
        day_file_listed,
    })
}

/// Splits a porcelain line into its two-character code and path part.
fn split_status_line(line: &str) -> Result<(&str, &str), StatusError> {
    let malformed = || StatusError::MalformedStatusLine {
        line: line.to_string(),
    };
    if line.len() < 4 || !line.is_char_boundary(2) {
        return Err(malformed());
    }
    let (code, rest) = line.split_at(2);
    let path = rest.strip_prefix(' ').ok_or_else(malformed)?;
    if path.is_empty() {
        return Err(malformed());
    }
    Ok((code, path))
}
