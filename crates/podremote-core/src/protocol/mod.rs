//! The line-oriented text protocol spoken over each TCP connection.
//!
//! Wire format:
//! ```text
//! client → host:  <verb>[ <argument>]\n        (one command per line)
//! host → client:  <reply>\n                   (one reply per command line)
//! ```
//!
//! All text is UTF-8.  Lines may end in `\n` or `\r\n`; each reply uses the
//! same terminator as the line it answers.

pub mod command;
pub mod framing;
pub mod reply;

use thiserror::Error;

pub use command::{Command, Direction};
pub use framing::{Frame, LineEnding, LineFramer, DEFAULT_MAX_LINE_LEN};
pub use reply::{Ack, Reply};

/// A line that could not be turned into a command.
///
/// Protocol errors are answered with an `error: ...` reply on the offending
/// connection; the connection stays open.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line exceeded the per-command length bound.
    #[error("command exceeds {max} bytes")]
    Oversized { max: usize },

    /// The line was not valid UTF-8.
    #[error("command is not valid UTF-8")]
    InvalidUtf8,

    /// A verb that requires an argument was sent without one.
    #[error("'{verb}' requires text after it")]
    MissingArgument { verb: &'static str },
}
