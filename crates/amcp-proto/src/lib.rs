//! # amcp-proto
//!
//! Protocol core for AMCP, the line-based control protocol of a broadcast
//! playout server. This crate holds the pieces of the protocol that are
//! pure data manipulation and shared between the daemon and its tests:
//!
//! - line tokenization with quoting and escape sequences
//! - frame timecodes with 24-hour wraparound arithmetic
//! - reply-line formatting (`RES {id} ...` prefixing, `\r\n` termination)
//!
//! No I/O and no async machinery lives here; the daemon layers transport
//! and execution on top.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod reply;
pub mod timecode;
pub mod tokenize;

pub use reply::format_reply;
pub use timecode::{FrameTimecode, TimecodeParseError};
pub use tokenize::tokenize;
