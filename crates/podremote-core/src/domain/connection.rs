//! Connection identifiers and the per-connection lifecycle state machine.
//!
//! # Connection lifecycle (for beginners)
//!
//! Every accepted TCP connection moves forward through these states and
//! never backwards:
//!
//! ```text
//! Connecting ──► Ready ──► Closing ──► Closed
//!     │            │                     ▲
//!     │            └─────────────────────┤
//!     └──────────► Closing / Closed ─────┘
//! ```
//!
//! - `Connecting`: accepted and registered; the session task has not started.
//! - `Ready`: the welcome line was sent; commands are being processed.
//! - `Closing`: an error, EOF, or local shutdown was observed; a final flush
//!   is being attempted.
//! - `Closed`: terminal.  The entry is discarded and its id is never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Opaque identifier of a connection, unique for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Raw numeric value, for logging.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Arena-style id allocator: ids increase monotonically and are never reused.
///
/// Ids start at 1 so that `0` never shows up in logs as a valid connection.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns a fresh id.
    ///
    /// `Relaxed` is enough: uniqueness comes from the atomic read-modify-write,
    /// not from ordering with other memory.
    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Lifecycle state of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionState {
    /// Accepted; session not yet running.
    Connecting,
    /// Receive loop running; commands are processed.
    Ready,
    /// Tear-down in progress.
    Closing,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if moving from `self` to `next` is a legal forward step.
    ///
    /// Self-transitions are rejected so that a repeated `Closing` is visible
    /// to the caller instead of being silently accepted.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Connecting, Ready)
                | (Connecting, Closing)
                | (Connecting, Closed)
                | (Ready, Closing)
                | (Ready, Closed)
                | (Closing, Closed)
        )
    }

    /// `true` for `Closed`.
    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(label)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
