//! `irc-logger` — capture one IRC channel into a spool directory.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use irclog::clock::SystemClock;
use irclog::irc::net::{self, NetError};
use irclog::irc::session::{self, Session, SessionConfig, SessionError};
use irclog::spool::writer::SpoolWriter;
use irclog::spool::SpoolError;

/// Default IRC-over-TLS port.
const DEFAULT_PORT: u16 = 6697;

#[derive(Debug, Parser)]
#[command(name = "irc-logger", about = "Log an IRC channel into a spool directory")]
struct Args {
    /// IRC server hostname.
    #[arg(long)]
    server: String,

    /// Nickname to register (collision retries append a counter).
    #[arg(long)]
    user: String,

    /// Channel name without the leading '#'.
    #[arg(long)]
    channel: String,

    /// Spool directory handed to the publisher.
    #[arg(long)]
    dir: PathBuf,

    /// NickServ password to identify with after the MOTD.
    #[arg(long)]
    password: Option<String>,

    /// Server port.
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,
}

#[derive(Debug, Error)]
enum LoggerError {
    #[error("spool directory {0:?} is not a directory")]
    SpoolDirMissing(PathBuf),

    #[error("{0}")]
    Spool(#[from] SpoolError),

    #[error("{0}")]
    Net(#[from] NetError),

    #[error("{0}")]
    Session(#[from] SessionError),
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
        eprintln!("irc-logger: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), LoggerError> {
    if !args.dir.is_dir() {
        return Err(LoggerError::SpoolDirMissing(args.dir));
    }
    let spool = SpoolWriter::open(&args.dir)?;

    tracing::info!(
        server = %args.server,
        port = args.port,
        channel = %args.channel,
        dir = %args.dir.display(),
        "starting IRC logger"
    );

    let mut stream = net::connect(&args.server, args.port)?;
    let config = SessionConfig {
        server: args.server,
        user: args.user,
        channel: args.channel,
        password: args.password,
    };
    let mut session = Session::new(config, spool, SystemClock);
    session::run(&mut session, &mut stream)?;
    Ok(())
}
