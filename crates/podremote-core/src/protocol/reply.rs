//! Reply rendering: the single text line written back for each command.
//!
//! | reply                | text                                          |
//! |----------------------|-----------------------------------------------|
//! | `Welcome`            | `welcome to MacController`                    |
//! | `Pong`               | `pong`                                        |
//! | `Status { active }`  | `status: 2 connected`                         |
//! | `Ack(..)`            | `ok: shutting down`, `ok: saying "hola"`, ... |
//! | `Unknown { verb }`   | `unknown command "x"; available: ping, ...`   |
//! | `Error(..)`          | `error: command exceeds 1024 bytes`           |
//!
//! Replies never contain a line break of their own: [`Reply::to_line`]
//! appends exactly one terminator.  Text echoed back from the client or the
//! config (say text, unknown verbs, the instance name) has its control
//! characters escaped, so a carriage return inside `say` text comes back as
//! the two characters `\r`.

use std::fmt::{self, Write as _};

use super::command::{Direction, COMMAND_LIST};
use super::framing::LineEnding;
use super::ProtocolError;

/// Longest echoed verb in an unknown-command reply, in characters.
const MAX_ECHOED_VERB_CHARS: usize = 40;

/// Acknowledgement of a command that triggers a host action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    Shutdown,
    Restart,
    Exit,
    Say(String),
    OpenMusic,
    PlayMusic,
    CloseMusic,
    Navigate(Direction),
    Confirm,
    Click,
    VolumeUp,
    VolumeDown,
}

/// A line sent from the host to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Unsolicited greeting sent once a connection is ready.
    Welcome { instance_name: String },
    Pong,
    /// Number of peers connected at the moment the command was processed.
    Status { active: usize },
    Ack(Ack),
    /// Catch-all for unrecognised verbs; lists the valid commands.
    Unknown { verb: String },
    Error(ProtocolError),
}

impl Reply {
    /// Renders the reply followed by `ending`.
    pub fn to_line(&self, ending: LineEnding) -> String {
        let mut line = self.to_string();
        line.push_str(ending.as_str());
        line
    }

    /// `true` for replies that report a problem with the request.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ack::Shutdown => f.write_str("ok: shutting down"),
            Ack::Restart => f.write_str("ok: restarting"),
            Ack::Exit => f.write_str("ok: exiting"),
            Ack::Say(text) => write!(f, "ok: saying \"{}\"", Echo(text)),
            Ack::OpenMusic => f.write_str("ok: opening music"),
            Ack::PlayMusic => f.write_str("ok: play/pause music"),
            Ack::CloseMusic => f.write_str("ok: closing music"),
            Ack::Navigate(direction) => write!(f, "ok: {direction}"),
            Ack::Confirm => f.write_str("ok: enter"),
            Ack::Click => f.write_str("ok: click"),
            Ack::VolumeUp => f.write_str("ok: volume up"),
            Ack::VolumeDown => f.write_str("ok: volume down"),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Welcome { instance_name } => write!(f, "welcome to {}", Echo(instance_name)),
            Reply::Pong => f.write_str("pong"),
            Reply::Status { active } => write!(f, "status: {active} connected"),
            Reply::Ack(ack) => ack.fmt(f),
            Reply::Unknown { verb } => {
                let echoed: String = verb.chars().take(MAX_ECHOED_VERB_CHARS).collect();
                write!(
                    f,
                    "unknown command \"{}\"; available: {COMMAND_LIST}",
                    Echo(&echoed)
                )
            }
            Reply::Error(error) => write!(f, "error: {error}"),
        }
    }
}

/// Writes text with control characters escaped (`\r` becomes `\\r`).
struct Echo<'a>(&'a str);

impl fmt::Display for Echo<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.0.chars() {
            if c.is_control() {
                write!(f, "{}", c.escape_default())?;
            } else {
                f.write_char(c)?;
            }
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
