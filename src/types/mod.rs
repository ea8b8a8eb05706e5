//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of raw integers and make the
//! spool filename and log filename codecs a single point of truth.

pub mod date;

pub use date::{DateNameError, LogDate};

use std::fmt;

/// A spool sequence number.
///
/// Spool files are named by the decimal rendering of this number, with no
/// leading zeros. Construction from a filename goes through [`SeqNum::parse`],
/// which accepts exactly the strings that [`SeqNum::to_string`] produces, so
/// a parsed name always round-trips to the file it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SeqNum(pub u32);

impl SeqNum {
    /// Parses a spool filename as a sequence number.
    ///
    /// Returns `None` for anything that is not the canonical decimal
    /// rendering of a `u32`: empty strings, non-digits, leading zeros,
    /// and values past `u32::MAX`.
    pub fn parse(name: &str) -> Option<SeqNum> {
        if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        if name.len() > 1 && name.starts_with('0') {
            return None;
        }
        name.parse().ok().map(SeqNum)
    }

    /// The sequence number the writer hands out after this one.
    pub fn next(self) -> SeqNum {
        SeqNum(self.0.wrapping_add(1))
    }
}

impl fmt::Display for SeqNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
