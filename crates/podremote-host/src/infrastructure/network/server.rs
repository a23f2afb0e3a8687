//! Server: lifecycle of the listener, the accept loop, and the advertisement.
//!
//! # State machine
//!
//! ```text
//!            start()              bind ok
//!  Stopped ──────────▶ Starting ──────────▶ Listening { port }
//!     ▲                   │ bind failed            │
//!     │                   ▼                        │ stop()
//!     │  stop()       Failed(reason) ◀─┐           │
//!     └───────────────────┴────────────┴───────────┘
//! ```
//!
//! `start()` is accepted from `Stopped` and `Failed`; while `Starting` or
//! `Listening` it returns [`ServerError::AlreadyRunning`] and changes
//! nothing.  `stop()` from `Stopped` is a no-op.
//!
//! The service record is only ever published while the state is
//! `Listening`: `start()` publishes after entering it and `stop()` withdraws
//! before leaving it.
//!
//! Observers (the UI bridge, the binary's logger) follow the state through
//! [`Server::subscribe_state`] and connectivity through
//! [`Server::connectivity`] instead of registering callbacks.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use podremote_core::protocol::DEFAULT_MAX_LINE_LEN;
use podremote_core::{PortSpec, ServiceRecord};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::connection_manager::{ConnectionInfo, ConnectionManager};
use super::listener::{BindError, Listener};
use super::session::{run_session, SessionContext};
use crate::application::dispatch_command::{CommandDispatcher, DispatchSettings};
use crate::application::execute_action::ActionExecutor;
use crate::infrastructure::actions::scheduler::EffectRunner;
use crate::infrastructure::discovery::{AdvertisementHandle, Advertiser};

/// Pause after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Capacity of the server-event broadcast channel.
const EVENT_CAPACITY: usize = 64;

/// Lifecycle state of the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ServerState {
    Stopped,
    Starting,
    Listening { port: u16 },
    Failed { reason: String },
}

impl ServerState {
    /// `true` while `Starting` or `Listening`.
    pub fn is_running(&self) -> bool {
        matches!(self, ServerState::Starting | ServerState::Listening { .. })
    }

    pub fn port(&self) -> Option<u16> {
        match self {
            ServerState::Listening { port } => Some(*port),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ServerState::Stopped => "stopped",
            ServerState::Starting => "starting",
            ServerState::Listening { .. } => "listening",
            ServerState::Failed { .. } => "failed",
        }
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Listening { port } => write!(f, "listening on port {port}"),
            ServerState::Failed { reason } => write!(f, "failed: {reason}"),
            other => f.write_str(other.label()),
        }
    }
}

/// Notifications for observers of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    StateChanged(ServerState),
    /// The record could not be published; the listener keeps running.
    AdvertiseFailed { reason: String },
}

/// Error type for server lifecycle operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("server is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Bind(#[from] BindError),
}

/// Runtime configuration of the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_address: IpAddr,
    pub port: PortSpec,
    pub max_command_len: usize,
    pub send_welcome: bool,
    /// Advertised identity; its port is replaced by the bound port.
    pub service: ServiceRecord,
    pub discovery_enabled: bool,
    pub dispatch: DispatchSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let service = ServiceRecord::default();
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: PortSpec::Fixed(service.port),
            max_command_len: DEFAULT_MAX_LINE_LEN,
            send_welcome: true,
            service,
            discovery_enabled: true,
            dispatch: DispatchSettings::default(),
        }
    }
}

struct Running {
    cancel: CancellationToken,
    accept_task: JoinHandle<()>,
    advertisement: Option<AdvertisementHandle>,
}

/// The command server.
pub struct Server {
    config: ServerConfig,
    manager: Arc<ConnectionManager>,
    context: Arc<SessionContext>,
    advertiser: Option<Arc<dyn Advertiser>>,
    sessions: TaskTracker,
    state: watch::Sender<ServerState>,
    connectivity: watch::Receiver<usize>,
    events: broadcast::Sender<ServerEvent>,
    exit: CancellationToken,
    running: Mutex<Option<Running>>,
}

impl Server {
    /// Creates a stopped server.
    pub fn new(
        config: ServerConfig,
        executor: Arc<dyn ActionExecutor>,
        advertiser: Option<Arc<dyn Advertiser>>,
    ) -> Self {
        let manager = Arc::new(ConnectionManager::new());
        let exit = CancellationToken::new();
        let context = Arc::new(SessionContext {
            manager: Arc::clone(&manager),
            dispatcher: CommandDispatcher::new(config.dispatch),
            effects: EffectRunner::new(executor, exit.clone()),
            max_line_len: config.max_command_len,
            welcome: config
                .send_welcome
                .then(|| config.service.instance_name.clone()),
        });
        let (state, _) = watch::channel(ServerState::Stopped);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let connectivity = manager.connectivity();

        Self {
            config,
            manager,
            context,
            advertiser,
            sessions: TaskTracker::new(),
            state,
            connectivity,
            events,
            exit,
            running: Mutex::new(None),
        }
    }

    /// Binds, starts accepting, and publishes the service record.
    ///
    /// Returns the bound port.  An advertisement failure is reported
    /// through [`ServerEvent::AdvertiseFailed`] and does not fail the start.
    ///
    /// # Errors
    ///
    /// - [`ServerError::AlreadyRunning`] while `Starting` or `Listening`.
    /// - [`ServerError::Bind`] when the port cannot be bound; the state
    ///   becomes `Failed`.
    pub async fn start(&self) -> Result<u16, ServerError> {
        let mut running = self.running.lock().await;
        if running.is_some() || self.state().is_running() {
            return Err(ServerError::AlreadyRunning);
        }

        self.set_state(ServerState::Starting);
        let listener = match Listener::bind(self.config.bind_address, self.config.port) {
            Ok(listener) => listener,
            Err(e) => {
                warn!(error = %e, "server failed to start");
                self.set_state(ServerState::Failed {
                    reason: e.to_string(),
                });
                return Err(e.into());
            }
        };
        let port = listener.local_port();

        let cancel = CancellationToken::new();
        self.manager.set_accepting(true).await;
        self.sessions.reopen();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            cancel.clone(),
            Arc::clone(&self.context),
            self.sessions.clone(),
        ));
        self.set_state(ServerState::Listening { port });
        let advertisement = self.advertise(port);

        *running = Some(Running {
            cancel,
            accept_task,
            advertisement,
        });
        Ok(port)
    }

    /// Stops accepting, withdraws the record, closes every connection, and
    /// waits for all sessions to finish.
    pub async fn stop(&self) {
        let mut running = self.running.lock().await;
        let Some(run) = running.take() else {
            if self.state() != ServerState::Stopped {
                self.set_state(ServerState::Stopped);
            }
            return;
        };

        run.cancel.cancel();
        if let Err(e) = run.accept_task.await {
            warn!(error = %e, "accept loop ended abnormally");
        }

        if let (Some(advertiser), Some(handle)) = (&self.advertiser, run.advertisement) {
            if let Err(e) = advertiser.withdraw(handle) {
                warn!(error = %e, "failed to withdraw service record");
            }
        }

        let closed = self.manager.close_all().await;
        self.sessions.close();
        self.sessions.wait().await;
        debug!(closed, "all sessions finished");

        self.set_state(ServerState::Stopped);
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ServerState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    /// Number of Ready connections.
    pub fn connected_count(&self) -> usize {
        *self.connectivity.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.connected_count() > 0
    }

    /// Watch channel carrying the number of Ready connections.
    pub fn connectivity(&self) -> watch::Receiver<usize> {
        self.manager.connectivity()
    }

    pub async fn connections(&self) -> Vec<ConnectionInfo> {
        self.manager.snapshot().await
    }

    /// Cancelled when a client's `exit` command takes effect.
    pub fn exit_requested(&self) -> CancellationToken {
        self.exit.clone()
    }

    fn set_state(&self, next: ServerState) {
        info!(state = %next, "server state changed");
        self.state.send_replace(next.clone());
        // No subscribers is fine.
        let _ = self.events.send(ServerEvent::StateChanged(next));
    }

    fn advertise(&self, port: u16) -> Option<AdvertisementHandle> {
        if !self.config.discovery_enabled {
            return None;
        }
        let advertiser = self.advertiser.as_ref()?;
        match advertiser.publish(self.config.service.with_port(port)) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "service advertisement failed; serving direct connections only");
                let _ = self.events.send(ServerEvent::AdvertiseFailed {
                    reason: e.to_string(),
                });
                None
            }
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("connected", &self.connected_count())
            .finish_non_exhaustive()
    }
}

async fn accept_loop(
    listener: Listener,
    cancel: CancellationToken,
    context: Arc<SessionContext>,
    sessions: TaskTracker,
) {
    info!(addr = %listener.local_addr(), "accepting connections");
    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, remote)) => {
                if let Err(e) = stream.set_nodelay(true) {
                    debug!(%remote, error = %e, "could not disable Nagle");
                }
                match context.manager.register(remote, &cancel).await {
                    Ok(registration) => {
                        sessions.spawn(run_session(
                            stream,
                            remote,
                            registration,
                            Arc::clone(&context),
                        ));
                    }
                    Err(e) => debug!(%remote, error = %e, "dropping connection"),
                }
            }
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }
    info!("accept loop stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
