//! IRC protocol handling for the logger.
//!
//! [`message`] parses single wire lines, [`session`] is the connection state
//! machine that drives registration, channel join, liveness pings and message
//! capture, and [`net`] owns the TLS stream and the readable-or-timeout wait.

pub mod message;
pub mod net;
pub mod session;
