//! Running `git` as a child process.
//!
//! The publisher drives the repository exclusively through the `git` binary
//! on `$PATH`: argv plus working directory in, captured stdout/stderr out.
//! Keeping the CLI as the interface keeps the repository portable and
//! inspectable with ordinary tools.

pub mod rollover;
pub mod status;

use std::io;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use thiserror::Error;
use tracing::debug;

/// Errors from git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A git command exited non-zero.
    #[error("child process failed: {command}\nstderr: {stderr}")]
    ChildProcessFailed { command: String, stderr: String },

    /// IO error spawning or talking to the child.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Result type for git operations.
pub type GitResult<T> = std::result::Result<T, GitError>;

/// Identity used for the publisher's commits.
///
/// Passed via `-c` flags so commits do not depend on host git config.
#[derive(Debug, Clone)]
pub struct CommitIdentity {
    /// Committer/author name (git `user.name`).
    pub name: String,

    /// Committer/author email (git `user.email`).
    pub email: String,
}

impl Default for CommitIdentity {
    fn default() -> Self {
        CommitIdentity {
            name: "irc-publisher".to_string(),
            email: "irc-publisher@localhost".to_string(),
        }
    }
}

/// Create a git Command with a clean environment.
///
/// System and user config are ignored so behavior does not vary across
/// machines, and terminal prompts are disabled.
fn git_command(workdir: &Path) -> Command {
    let mut cmd = Command::new("git");
    cmd.current_dir(workdir);
    cmd.stdin(Stdio::null());
    cmd.env("GIT_CONFIG_NOSYSTEM", "1");
    cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
    cmd.env("GIT_TERMINAL_PROMPT", "0");
    cmd
}

fn check(command: String, output: Output) -> GitResult<Output> {
    if output.status.success() {
        Ok(output)
    } else {
        Err(GitError::ChildProcessFailed {
            command,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Runs a git command and returns its captured output.
pub fn run_captured(workdir: &Path, args: &[&str]) -> GitResult<Output> {
    let output = git_command(workdir).args(args).output()?;
    check(format!("git {}", args.join(" ")), output)
}

/// Runs a git command, logging its output instead of returning it.
pub fn run_logged(workdir: &Path, args: &[&str]) -> GitResult<()> {
    let output = run_captured(workdir, args)?;
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(
        command = %format!("git {}", args.join(" ")),
        stdout = %stdout.trim_end(),
        stderr = %stderr.trim_end(),
        "git"
    );
    Ok(())
}

/// Runs a git command and returns trimmed stdout as a string.
pub fn run_stdout(workdir: &Path, args: &[&str]) -> GitResult<String> {
    let output = run_captured(workdir, args)?;
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Creates a commit with the given message under an explicit identity.
pub fn commit(workdir: &Path, identity: &CommitIdentity, message: &str) -> GitResult<()> {
    let name = format!("user.name={}", identity.name);
    let email = format!("user.email={}", identity.email);
    run_logged(
        workdir,
        &["-c", &name, "-c", &email, "commit", "-m", message],
    )
}
