//! Command grammar: turns one framed line into a typed [`Command`].
//!
//! # Grammar
//!
//! ```text
//! line     = verb | speak-verb SP text
//! verb     = "ping" | "status" | "shutdown" | "restart" | "exit"
//!          | "open music" | "play music" | "close music"
//!          | "up" | "down" | "left" | "right" | "enter" | "click"
//!          | "volume up" | "volume down"
//! speak    = "say" | "speak"
//! ```
//!
//! Matching is case-insensitive.  For fixed-form verbs `-` and `_` count as
//! spaces and runs of whitespace collapse, so `Volume-Up`, `volume_up` and
//! `VOLUME   UP` are the same command.  The speak verbs are the only ones
//! with a free-text argument: everything after the verb and its separating
//! whitespace is passed through verbatim, including inner spacing and
//! non-ASCII text.
//!
//! Unrecognised input is never an error; it parses to [`Command::Unknown`]
//! and is answered with the list of valid commands.

use std::fmt;

use super::ProtocolError;
use crate::keymap::RemoteKey;

/// Verbs that take the rest of the line as text to speak.
const SPEAK_VERBS: [&str; 2] = ["say", "speak"];

/// Human-readable list of every command, used in the unknown-command reply.
pub const COMMAND_LIST: &str = "ping, status, shutdown, restart, exit, say <text>, \
open music, play music, close music, up, down, left, right, enter, click, \
volume up, volume down";

/// A navigation direction sent by the remote's d-pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// The key simulated for this direction; each direction has its own key.
    pub fn key(self) -> RemoteKey {
        match self {
            Direction::Up => RemoteKey::ArrowUp,
            Direction::Down => RemoteKey::ArrowDown,
            Direction::Left => RemoteKey::ArrowLeft,
            Direction::Right => RemoteKey::ArrowRight,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Report the number of connected peers.
    Status,
    /// Power off the host.
    Shutdown,
    /// Restart the host.
    Restart,
    /// Terminate the server process.
    Exit,
    /// Speak the given text aloud.
    Say(String),
    OpenMusic,
    PlayMusic,
    CloseMusic,
    /// Press an arrow key.
    Navigate(Direction),
    /// Press Return.
    Confirm,
    /// Click the mouse at its current position.
    Click,
    VolumeUp,
    VolumeDown,
    /// Anything else, normalised (lower case, single spaces).
    Unknown(String),
}

impl Command {
    /// Parses one line (terminator already removed).
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MissingArgument`] for a speak verb with no
    /// text.  Unknown verbs are *not* errors.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use podremote_core::protocol::{Command, Direction};
    ///
    /// assert_eq!(Command::parse("PING").unwrap(), Command::Ping);
    /// assert_eq!(Command::parse(" up ").unwrap(), Command::Navigate(Direction::Up));
    /// assert_eq!(
    ///     Command::parse("SAY hola mundo").unwrap(),
    ///     Command::Say("hola mundo".to_string())
    /// );
    /// ```
    pub fn parse(line: &str) -> Result<Command, ProtocolError> {
        let line = line.trim();

        let (head, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        if SPEAK_VERBS.iter().any(|verb| head.eq_ignore_ascii_case(verb)) {
            let text = rest.trim_start();
            if text.is_empty() {
                return Err(ProtocolError::MissingArgument { verb: "say" });
            }
            return Ok(Command::Say(text.to_string()));
        }

        let normalized = normalize(line);
        let command = match normalized.as_str() {
            "ping" => Command::Ping,
            "status" => Command::Status,
            "shutdown" => Command::Shutdown,
            "restart" | "reboot" => Command::Restart,
            "exit" | "quit" => Command::Exit,
            "open music" => Command::OpenMusic,
            "play music" => Command::PlayMusic,
            "close music" => Command::CloseMusic,
            "up" => Command::Navigate(Direction::Up),
            "down" => Command::Navigate(Direction::Down),
            "left" => Command::Navigate(Direction::Left),
            "right" => Command::Navigate(Direction::Right),
            "enter" | "confirm" => Command::Confirm,
            "click" | "mouse click" => Command::Click,
            "volume up" => Command::VolumeUp,
            "volume down" => Command::VolumeDown,
            _ => Command::Unknown(normalized),
        };
        Ok(command)
    }

    /// Canonical verb, e.g. `"volume up"` or `"say"`.
    pub fn verb(&self) -> &str {
        match self {
            Command::Ping => "ping",
            Command::Status => "status",
            Command::Shutdown => "shutdown",
            Command::Restart => "restart",
            Command::Exit => "exit",
            Command::Say(_) => "say",
            Command::OpenMusic => "open music",
            Command::PlayMusic => "play music",
            Command::CloseMusic => "close music",
            Command::Navigate(direction) => direction.as_str(),
            Command::Confirm => "enter",
            Command::Click => "click",
            Command::VolumeUp => "volume up",
            Command::VolumeDown => "volume down",
            Command::Unknown(verb) => verb,
        }
    }

    /// Free-text argument, present only for [`Command::Say`].
    pub fn argument(&self) -> Option<&str> {
        match self {
            Command::Say(text) => Some(text),
            _ => None,
        }
    }

    /// Shutdown, restart and exit tear down the connection they arrive on,
    /// so their effect is delayed until the acknowledgement is flushed.
    pub fn is_destructive(&self) -> bool {
        matches!(self, Command::Shutdown | Command::Restart | Command::Exit)
    }
}

/// Lower-cases, maps `-`/`_` to spaces and collapses whitespace runs.
fn normalize(line: &str) -> String {
    line.to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
