//! `irc-publisher` — drain the spool into a date-partitioned Git repository.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use irclog::git::CommitIdentity;
use irclog::publish::{watcher, PublishError};

#[derive(Debug, Parser)]
#[command(
    name = "irc-publisher",
    about = "Publish spooled IRC messages into a Git repository"
)]
struct Args {
    /// The logger's spool directory.
    #[arg(long = "logger-dir")]
    logger_dir: PathBuf,

    /// Git working tree with an `origin` remote configured.
    #[arg(long)]
    repo: PathBuf,
}

#[derive(Debug, Error)]
enum PublisherError {
    #[error("spool directory {0:?} is not a directory")]
    SpoolDirMissing(PathBuf),

    #[error("{0:?} is not a git repository (no .git entry)")]
    NotARepo(PathBuf),

    #[error("{0}")]
    Publish(#[from] PublishError),
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "irclog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        eprintln!("irc-publisher: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), PublisherError> {
    if !args.logger_dir.is_dir() {
        return Err(PublisherError::SpoolDirMissing(args.logger_dir));
    }
    if !args.repo.join(".git").exists() {
        return Err(PublisherError::NotARepo(args.repo));
    }

    tracing::info!(
        spool = %args.logger_dir.display(),
        repo = %args.repo.display(),
        "starting publisher"
    );

    watcher::run(&args.logger_dir, &args.repo, CommitIdentity::default())?;
    Ok(())
}
