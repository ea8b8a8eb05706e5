//! Parser for single IRC wire lines (RFC 1459 framing, no CRLF).
//!
//! A line decomposes into an optional `:<prefix> `, a command (a letters-only
//! name or a three-digit numeric code), and a parameter region. The parsed
//! [`Message`] stores byte offsets into the original line rather than owned
//! strings; all offsets fit in 16 bits, which bounds accepted lines to
//! [`MAX_LINE_LEN`] bytes.

use std::ops::Range;

use thiserror::Error;

/// Lines must be shorter than this so every offset fits in a `u16`.
pub const MAX_LINE_LEN: usize = u16::MAX as usize;

/// Errors from parsing one wire line.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line is too long for 16-bit offsets.
    #[error("message of {0} bytes does not fit in 16-bit offsets")]
    MsgTooBig(usize),

    /// The line starts a prefix but never terminates it with a space.
    #[error("missing space after message prefix")]
    MissingSpaceAfterMsgPrefix,

    /// The line ends where a command was expected.
    #[error("message has no command")]
    MissingCommand,

    /// The command is neither a letters-only name nor a three-digit code,
    /// or is not followed by a space.
    #[error("malformed message")]
    InvalidMsg,
}

/// Result type for message parsing.
pub type Result<T> = std::result::Result<T, ParseError>;

/// The command of a message: a name span into the line, or a numeric code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Byte range of a letters-only command name, e.g. `NOTICE`.
    Name(Range<u16>),
    /// A three-digit numeric reply code, 0..=999.
    Code(u16),
}

/// A parsed wire line, as offsets into the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Offset of the space terminating the prefix; 0 when there is no prefix.
    pub prefix_limit: u16,
    /// The command.
    pub cmd: Cmd,
    /// Offset of the first parameter byte (just past the command's space).
    pub params_off: u16,
}

impl Message {
    /// The sender prefix text (between `:` and the first space), if any.
    pub fn prefix<'a>(&self, line: &'a str) -> Option<&'a str> {
        if self.prefix_limit == 0 {
            None
        } else {
            Some(&line[1..usize::from(self.prefix_limit)])
        }
    }

    /// The command name text, for name commands.
    pub fn name<'a>(&self, line: &'a str) -> Option<&'a str> {
        match &self.cmd {
            Cmd::Name(range) => {
                Some(&line[usize::from(range.start)..usize::from(range.end)])
            }
            Cmd::Code(_) => None,
        }
    }

    /// The raw parameter region, exactly as received.
    pub fn raw_params<'a>(&self, line: &'a str) -> &'a str {
        &line[usize::from(self.params_off)..]
    }

    /// Iterator over the parameters.
    pub fn params<'a>(&self, line: &'a str) -> Params<'a> {
        Params {
            rest: self.raw_params(line),
        }
    }
}

/// Parses one wire line (CRLF already stripped).
pub fn parse(line: &str) -> Result<Message> {
    if line.len() >= MAX_LINE_LEN {
        return Err(ParseError::MsgTooBig(line.len()));
    }
    let bytes = line.as_bytes();

    let (prefix_limit, cmd_start) = if bytes.first() == Some(&b':') {
        let space = bytes
            .iter()
            .position(|&b| b == b' ')
            .ok_or(ParseError::MissingSpaceAfterMsgPrefix)?;
        (space as u16, space + 1)
    } else {
        (0, 0)
    };

    if cmd_start >= bytes.len() {
        return Err(ParseError::MissingCommand);
    }

    let first = bytes[cmd_start];
    if first.is_ascii_digit() {
        // Exactly three digits followed by a space.
        let code_end = cmd_start + 3;
        if bytes.len() <= code_end
            || bytes[code_end] != b' '
            || !bytes[cmd_start..code_end].iter().all(u8::is_ascii_digit)
        {
            return Err(ParseError::InvalidMsg);
        }
        let code = bytes[cmd_start..code_end]
            .iter()
            .fold(0u16, |acc, &b| acc * 10 + u16::from(b - b'0'));
        Ok(Message {
            prefix_limit,
            cmd: Cmd::Code(code),
            params_off: (code_end + 1) as u16,
        })
    } else if first.is_ascii_alphabetic() {
        let mut end = cmd_start;
        while end < bytes.len() && bytes[end].is_ascii_alphabetic() {
            end += 1;
        }
        if end >= bytes.len() || bytes[end] != b' ' {
            return Err(ParseError::InvalidMsg);
        }
        Ok(Message {
            prefix_limit,
            cmd: Cmd::Name(cmd_start as u16..end as u16),
            params_off: (end + 1) as u16,
        })
    } else {
        Err(ParseError::InvalidMsg)
    }
}

/// Iterator over the parameters of a message.
///
/// Parameters are separated by runs of spaces. A parameter beginning with
/// `:` consumes the remainder of the line verbatim (the trailing parameter).
/// Once exhausted, `next` keeps returning `None`.
#[derive(Debug, Clone)]
pub struct Params<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Params<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start_matches(' ');
        if rest.is_empty() {
            self.rest = rest;
            return None;
        }
        if let Some(trailing) = rest.strip_prefix(':') {
            self.rest = "";
            return Some(trailing);
        }
        match rest.find(' ') {
            Some(i) => {
                self.rest = &rest[i..];
                Some(&rest[..i])
            }
            None => {
                self.rest = "";
                Some(rest)
            }
        }
    }
}
