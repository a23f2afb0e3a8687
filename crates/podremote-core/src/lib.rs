//! # podremote-core
//!
//! Shared library for PodRemote containing the line protocol, the domain
//! entities, and the key code tables used for input simulation.
//!
//! This crate has zero dependencies on OS APIs, sockets, or async runtimes.
//! Everything here is plain data plus pure functions, so it can be tested
//! byte-for-byte without opening a single connection.
//!
//! # Architecture overview (for beginners)
//!
//! PodRemote turns a computer into a remote-controllable host.  A companion
//! device (a phone, an old iPod touch) finds the host on the local network
//! via DNS-SD, opens a TCP connection, and sends short text commands such as
//! `ping`, `volume up`, or `say hello`.  The host answers every command with
//! exactly one text line.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes become commands and replies.  The
//!   [`LineFramer`] reassembles newline-delimited lines from arbitrarily
//!   chunked reads, [`Command::parse`] turns a line into a typed command, and
//!   [`Reply`] renders the answer.
//!
//! - **`domain`** – The service record that is advertised, the connection
//!   lifecycle state machine, and the clamped volume level.
//!
//! - **`keymap`** – The handful of keys the remote can press, with their
//!   macOS, X11, and Windows codes.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::connection::{ConnectionId, ConnectionIdAllocator, ConnectionState};
pub use domain::service::{PortSpec, ServiceRecord};
pub use domain::volume::VolumeLevel;
pub use keymap::RemoteKey;
pub use protocol::command::{Command, Direction};
pub use protocol::framing::{Frame, LineEnding, LineFramer};
pub use protocol::reply::{Ack, Reply};
pub use protocol::ProtocolError;
