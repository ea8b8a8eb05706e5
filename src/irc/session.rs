//! The logger's connection state machine.
//!
//! A session goes through two stages: `Setup` (registration, optional
//! NickServ identification, channel join) and `Joined` (message capture).
//! It is driven by parsed server messages and by silence timeouts from the
//! readable-or-timeout wait; every captured channel message becomes one
//! spool entry.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::os::fd::{AsFd, BorrowedFd};

use native_tls::TlsStream;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::spool::writer::SpoolWriter;
use crate::spool::SpoolError;

use super::message::{self, Cmd, Message, ParseError, MAX_LINE_LEN};
use super::net::{wait_readable, Wait};

/// Seconds of server silence before the session probes with a PING.
pub const MAX_SILENCE_SECONDS: u64 = 60;

/// Seconds to wait for the PONG before giving the connection up.
pub const PONG_RESPONSE_TIMEOUT: u64 = 20;

/// Sender recorded when a message arrives without a prefix.
const UNKNOWN_SENDER: &str = "???";

/// Errors that end the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// NickServ rejected the configured password.
    #[error("invalid password")]
    InvalidPassword,

    /// The server refused the channel join (numeric 477).
    #[error("cannot join channel #{0}")]
    CannotJoinChannel(String),

    /// The server joined us to a channel we never asked for.
    #[error("joined wrong channel {got:?}, wanted #{want}")]
    JoinedWrongChannel { want: String, got: String },

    /// The server stopped answering PING probes.
    #[error("no PING response from server")]
    NoPingResponse,

    /// The server closed the connection.
    #[error("connection closed by server")]
    ConnectionClosed,

    /// A received line did not parse.
    #[error("message parse error: {0}")]
    Parse(#[from] ParseError),

    /// Spooling a captured message failed.
    #[error("spool error: {0}")]
    Spool(#[from] SpoolError),

    /// IO error on the connection.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// Protocol stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Registering, identifying, joining.
    Setup,
    /// In the channel, capturing messages.
    Joined,
}

/// Liveness tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PingState {
    /// Reads are flowing; probe when the deadline passes.
    Normal { silence_deadline: u64 },
    /// A probe is outstanding; give up when the deadline passes.
    Sent { giveup_deadline: u64 },
}

/// Connection parameters for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Server hostname, also the PING probe target.
    pub server: String,
    /// Base nickname; collision retries append a counter.
    pub user: String,
    /// Channel name without the leading `#`.
    pub channel: String,
    /// NickServ password, if identification is wanted.
    pub password: Option<String>,
}

/// The connection state machine.
///
/// Generic over the clock so tests can script time; the outbound half of
/// the connection is passed into each handler as a plain [`Write`].
#[derive(Debug)]
pub struct Session<C: Clock> {
    config: SessionConfig,
    stage: Stage,
    nick_suffix: u16,
    ping: PingState,
    last_read: u64,
    spool: SpoolWriter,
    clock: C,
}

impl<C: Clock> Session<C> {
    pub fn new(config: SessionConfig, spool: SpoolWriter, clock: C) -> Session<C> {
        let now = clock.now();
        Session {
            config,
            stage: Stage::Setup,
            nick_suffix: 0,
            ping: PingState::Normal {
                silence_deadline: now + MAX_SILENCE_SECONDS,
            },
            last_read: now,
            spool,
            clock,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn ping_state(&self) -> PingState {
        self.ping
    }

    /// The nickname currently in use: the base name, or base plus the
    /// collision counter after 433 retries.
    pub fn current_nick(&self) -> String {
        if self.nick_suffix == 0 {
            self.config.user.clone()
        } else {
            format!("{}{}", self.config.user, self.nick_suffix)
        }
    }

    /// The deadline the caller should wait until before calling
    /// [`Session::on_timeout`].
    pub fn deadline(&self) -> u64 {
        match self.ping {
            PingState::Normal { silence_deadline } => silence_deadline,
            PingState::Sent { giveup_deadline } => giveup_deadline,
        }
    }

    /// Records a successful read at `read_time`, re-arming the silence
    /// deadline.
    pub fn note_read(&mut self, read_time: u64) {
        self.last_read = read_time;
        self.ping = PingState::Normal {
            silence_deadline: read_time + MAX_SILENCE_SECONDS,
        };
    }

    /// The wait deadline passed without a read.
    pub fn on_timeout(&mut self, out: &mut impl Write) -> Result<()> {
        match self.ping {
            PingState::Normal { .. } => {
                debug!(server = %self.config.server, "silence limit hit, probing");
                send(out, &format!("PING {}", self.config.server))?;
                self.ping = PingState::Sent {
                    giveup_deadline: self.clock.now() + PONG_RESPONSE_TIMEOUT,
                };
                Ok(())
            }
            PingState::Sent { .. } => Err(SessionError::NoPingResponse),
        }
    }

    /// Handles one received line (CRLF already stripped).
    pub fn handle_line(&mut self, line: &str, out: &mut impl Write) -> Result<()> {
        let msg = message::parse(line)?;
        match &msg.cmd {
            Cmd::Name(_) => match msg.name(line).unwrap_or("") {
                "NOTICE" => self.on_notice(line, &msg, out),
                "PING" => send(out, &format!("PONG {}", msg.raw_params(line))),
                "PONG" => Ok(()),
                "JOIN" => self.on_join(line, &msg),
                "PRIVMSG" => self.on_privmsg(line, &msg),
                other => {
                    debug!(command = other, "ignoring");
                    Ok(())
                }
            },
            Cmd::Code(376) => self.on_end_of_motd(out),
            Cmd::Code(433) => self.on_nick_collision(out),
            Cmd::Code(477) => Err(SessionError::CannotJoinChannel(self.config.channel.clone())),
            Cmd::Code(code) => {
                debug!(code, "ignoring numeric");
                Ok(())
            }
        }
    }

    fn on_notice(&mut self, line: &str, msg: &Message, out: &mut impl Write) -> Result<()> {
        let mut params = msg.params(line);
        let target = params.next().unwrap_or("");
        let text = params.next().unwrap_or("");
        if !self.addressed_to_me(target) {
            return Ok(());
        }
        if text == "*** No Ident response" {
            self.send_registration(out)
        } else if text.starts_with("You are now identified for ") {
            self.send_join(out)
        } else if text.starts_with("Invalid password for ") {
            Err(SessionError::InvalidPassword)
        } else {
            Ok(())
        }
    }

    fn on_join(&mut self, line: &str, msg: &Message) -> Result<()> {
        let joined = msg.params(line).next().unwrap_or("");
        let want = format!("#{}", self.config.channel);
        if joined == want {
            if self.stage != Stage::Joined {
                info!(channel = %want, "joined channel");
            }
            self.stage = Stage::Joined;
            Ok(())
        } else {
            Err(SessionError::JoinedWrongChannel {
                want: self.config.channel.clone(),
                got: joined.to_string(),
            })
        }
    }

    fn on_privmsg(&mut self, line: &str, msg: &Message) -> Result<()> {
        let mut params = msg.params(line);
        let target = params.next().unwrap_or("");
        if target != format!("#{}", self.config.channel) {
            return Ok(());
        }
        let body = params.next().unwrap_or("");
        let sender = msg.prefix(line).unwrap_or(UNKNOWN_SENDER);
        let seq = self.spool.append(self.last_read, sender, body)?;
        debug!(seq = %seq, sender, "captured message");
        Ok(())
    }

    fn on_end_of_motd(&mut self, out: &mut impl Write) -> Result<()> {
        match &self.config.password {
            Some(password) => {
                let line = format!("PRIVMSG NickServ :identify {}", password);
                send(out, &line)
            }
            None => self.send_join(out),
        }
    }

    fn on_nick_collision(&mut self, out: &mut impl Write) -> Result<()> {
        self.nick_suffix = self.nick_suffix.wrapping_add(1);
        warn!(next_nick = %self.current_nick(), "nickname in use, retrying");
        self.send_registration(out)
    }

    fn send_registration(&mut self, out: &mut impl Write) -> Result<()> {
        let nick = self.current_nick();
        send(out, &format!("NICK {}", nick))?;
        send(out, &format!("USER {} * * :{}", nick, nick))
    }

    fn send_join(&mut self, out: &mut impl Write) -> Result<()> {
        send(out, &format!("JOIN #{}", self.config.channel))
    }

    fn addressed_to_me(&self, target: &str) -> bool {
        target == "*" || target == "$$*" || target == self.current_nick()
    }
}

fn send(out: &mut impl Write, line: &str) -> Result<()> {
    debug!(line, "send");
    out.write_all(line.as_bytes())?;
    out.write_all(b"\r\n")?;
    out.flush()?;
    Ok(())
}

/// Splits a byte stream into lines bounded by [`MAX_LINE_LEN`].
#[derive(Debug, Default)]
struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    /// Appends a chunk and returns every complete line in it, with line
    /// terminators stripped.
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        if self.buf.len() >= MAX_LINE_LEN {
            return Err(ParseError::MsgTooBig(self.buf.len()).into());
        }
        Ok(lines)
    }
}

/// The connection as the run loop sees it: a byte stream with a pollable fd.
pub trait SessionStream: Read + Write {
    /// The fd the readable-or-timeout wait polls.
    fn poll_fd(&self) -> BorrowedFd<'_>;
}

impl SessionStream for TlsStream<TcpStream> {
    fn poll_fd(&self) -> BorrowedFd<'_> {
        self.get_ref().as_fd()
    }
}

/// Drives a session over a live connection until a fatal error.
///
/// Alternates between waiting for readability (bounded by the ping
/// deadline) and reading; the state machine itself stays synchronous.
pub fn run<C: Clock, S: SessionStream>(session: &mut Session<C>, stream: &mut S) -> Result<()> {
    let mut lines = LineBuffer::default();
    let mut chunk = [0u8; 4096];
    loop {
        let now = session.clock.now();
        let timeout_ms = session
            .deadline()
            .saturating_sub(now)
            .saturating_mul(1000)
            .min(u64::from(u16::MAX)) as u16;
        let wait = wait_readable(stream.poll_fd(), timeout_ms)?;
        match wait {
            Wait::TimedOut => session.on_timeout(stream)?,
            Wait::Ready => {
                let n = stream.read(&mut chunk)?;
                if n == 0 {
                    return Err(SessionError::ConnectionClosed);
                }
                session.note_read(session.clock.now());
                for line in lines.push(&chunk[..n])? {
                    session.handle_line(&line, stream)?;
                }
            }
        }
    }
}
