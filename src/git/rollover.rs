//! Day rollover: folding live-update commits into one commit per closed day.
//!
//! The `live` branch is force-pushed after every drain and carries one
//! "live update" commit per drain. When a message for a later day arrives,
//! the engine rewrites those commits away: it soft-resets to the last
//! non-live commit, commits the closed day's file as a single commit whose
//! message is the file's path, fast-forwards `master`, and removes the
//! `now` link so the router can re-point it at the new day.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use super::status::{self, NowState, StatusError};
use super::{commit, run_logged, run_stdout, CommitIdentity, GitError};

/// Name of the repo-root symlink at the currently open day file.
pub const NOW_LINK: &str = "now";

/// Commit message prefix of intra-day live publications.
pub const LIVE_UPDATE: &str = "live update";

/// Errors from the branch-rewrite sequence.
#[derive(Debug, Error)]
pub enum RolloverError {
    #[error("git error: {0}")]
    Git(#[from] GitError),

    #[error("{0}")]
    Status(#[from] StatusError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Publishes everything in the working tree as one `live update` commit and
/// force-pushes it to `origin/live`.
pub fn publish_live_update(repo: &Path, identity: &CommitIdentity) -> Result<(), GitError> {
    run_logged(repo, &["add", "."])?;
    commit(repo, identity, LIVE_UPDATE)?;
    run_logged(repo, &["push", "origin", "HEAD:live", "-f"])?;
    debug!("pushed live update");
    Ok(())
}

/// Closes the day whose log file is `old_target` (the path the `now` link
/// pointed at before the rollover).
///
/// After this returns, the live-update commits have been rebased away, the
/// closed day is a single commit on `master` (when it had any content this
/// cycle), and the `now` link is gone from the working tree. The caller
/// re-points `now` at the new day and appends the message that triggered
/// the rollover.
pub fn close_day(
    repo: &Path,
    identity: &CommitIdentity,
    old_target: &str,
) -> Result<(), RolloverError> {
    // Walk HEAD back past every live-update commit to the last real commit.
    let mut base = run_stdout(repo, &["rev-parse", "HEAD"])?;
    loop {
        let message = run_stdout(repo, &["show", "-s", "--format=%B", &base])?;
        if !message.starts_with(LIVE_UPDATE) {
            break;
        }
        base = run_stdout(repo, &["rev-parse", &format!("{}^", base)])?;
    }
    run_logged(repo, &["reset", "--soft", &base])?;

    // Everything the live updates touched is now staged; the only admissible
    // paths are the now link and the closed day's file.
    let status = status::snapshot(repo, NOW_LINK, old_target)?;

    // Symlinks are never committed to master.
    if status.now == NowState::Tracked {
        run_logged(repo, &["rm", "--cached", NOW_LINK])?;
    }

    if status.day_file_listed {
        run_logged(repo, &["add", old_target])?;
        commit(repo, identity, old_target)?;
        run_logged(repo, &["push", "origin", "HEAD:master"])?;
        info!(day = old_target, "closed day committed to master");
    } else {
        debug!(day = old_target, "nothing new this day, no master commit");
    }

    // The link must outlive the master push above, so this comes last.
    if status.now != NowState::Missing {
        fs::remove_file(repo.join(NOW_LINK))?;
    }

    Ok(())
}
