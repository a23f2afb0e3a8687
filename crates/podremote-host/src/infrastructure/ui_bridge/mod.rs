//! UI bridge: the operations a status-bar front end needs.
//!
//! The classic host UI is tiny: a power button that starts and stops the
//! server, and a label saying whether a device is connected.  This module
//! exposes exactly that to whatever presentation layer embeds the host
//! (a tray icon, a menu-bar app, a web panel) as plain async functions
//! returning serialisable DTOs.
//!
//! # Data Transfer Objects (DTOs)
//!
//! Internal types such as [`ServerState`] or `ConnectionId` are turned into
//! simple structs (`StatusDto`, `ConnectionDto`) holding only strings,
//! numbers, and booleans, so the front end can consume them as JSON without
//! knowing any Rust types.
//!
//! # `CommandResult<T>` wrapper
//!
//! Every operation returns `CommandResult<T>` with the same shape,
//! `{ success, data, error }`, so callers never need a try/catch around
//! the call.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::infrastructure::network::server::{Server, ServerError, ServerState};

/// Label shown while at least one device is connected.
pub const CONNECTED_LABEL: &str = "device connected";
/// Label shown while no device is connected.
pub const DISCONNECTED_LABEL: &str = "device disconnected";

// ── Shared application state ──────────────────────────────────────────────────

/// State shared between UI operations.
pub struct HostAppState {
    server: Arc<Server>,
}

impl HostAppState {
    pub fn new(server: Arc<Server>) -> Arc<Self> {
        Arc::new(Self { server })
    }

    pub fn server(&self) -> &Arc<Server> {
        &self.server
    }

    /// The power button: starts the server when it is not running, stops it
    /// otherwise.  Returns the state reached.
    ///
    /// # Errors
    ///
    /// Propagates [`ServerError`] from `start`; the state is then `Failed`.
    pub async fn toggle(&self) -> Result<ServerState, ServerError> {
        if self.server.state().is_running() {
            info!("stopping server from UI");
            self.server.stop().await;
        } else {
            info!("starting server from UI");
            self.server.start().await?;
        }
        Ok(self.server.state())
    }

    /// Current status for display.
    pub fn snapshot(&self) -> StatusDto {
        StatusDto::new(&self.server.state(), self.server.connected_count())
    }
}

// ── Data Transfer Objects ─────────────────────────────────────────────────────

/// What the status bar shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDto {
    /// `stopped`, `starting`, `listening`, or `failed`.
    pub state: String,
    pub port: Option<u16>,
    pub failure: Option<String>,
    pub connected: bool,
    pub connection_count: usize,
    /// Human-readable connectivity label.
    pub label: String,
}

impl StatusDto {
    pub fn new(state: &ServerState, connection_count: usize) -> Self {
        let connected = connection_count > 0;
        let failure = match state {
            ServerState::Failed { reason } => Some(reason.clone()),
            _ => None,
        };
        Self {
            state: state.label().to_string(),
            port: state.port(),
            failure,
            connected,
            connection_count,
            label: if connected {
                CONNECTED_LABEL
            } else {
                DISCONNECTED_LABEL
            }
            .to_string(),
        }
    }
}

/// One live connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDto {
    pub id: String,
    pub remote: String,
    pub state: String,
    pub open_for_secs: u64,
}

/// Unified response wrapper for UI operations.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandResult<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> CommandResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── UI operations ─────────────────────────────────────────────────────────────

/// Returns the current status.
pub async fn get_status(state: Arc<HostAppState>) -> CommandResult<StatusDto> {
    CommandResult::ok(state.snapshot())
}

/// Starts or stops the server and returns the resulting status.
pub async fn toggle_server(state: Arc<HostAppState>) -> CommandResult<StatusDto> {
    match state.toggle().await {
        Ok(_) => CommandResult::ok(state.snapshot()),
        Err(e) => CommandResult::err(e.to_string()),
    }
}

/// Lists the live connections, oldest first.
pub async fn get_connections(state: Arc<HostAppState>) -> CommandResult<Vec<ConnectionDto>> {
    let dtos = state
        .server
        .connections()
        .await
        .into_iter()
        .map(|c| ConnectionDto {
            id: c.id.to_string(),
            remote: c.remote.to_string(),
            state: c.state.to_string(),
            open_for_secs: c.opened_at.elapsed().as_secs(),
        })
        .collect();
    CommandResult::ok(dtos)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
