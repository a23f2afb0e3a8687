//! ConnectionManager: the registry of live connections.
//!
//! Every accepted socket is registered here under a fresh [`ConnectionId`]
//! and removed exactly once when its session ends.  The registry is the only
//! shared mutable state in the server; it lives behind a single
//! `tokio::sync::Mutex` so the count of Ready connections can never drift
//! from the map it is computed from.
//!
//! Observers get two feeds:
//!
//! - [`ConnectionManager::connectivity`] – a `watch` channel holding the
//!   number of Ready connections (the UI shows "device connected" when it
//!   is above zero).
//! - [`ConnectionManager::subscribe`] – a `broadcast` channel of
//!   per-connection state changes, in the order they happened.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Instant;

use podremote_core::{ConnectionId, ConnectionIdAllocator, ConnectionState};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the connection-event broadcast channel.
const EVENT_CAPACITY: usize = 256;

/// Error type for registry operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("server is not accepting connections")]
    NotAccepting,
    #[error("connection not found: {0}")]
    UnknownConnection(ConnectionId),
    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: ConnectionId,
        from: ConnectionState,
        to: ConnectionState,
    },
}

/// A state change of one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionEvent {
    pub id: ConnectionId,
    pub remote: SocketAddr,
    pub state: ConnectionState,
}

/// Read-only view of one registered connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub remote: SocketAddr,
    pub state: ConnectionState,
    pub opened_at: Instant,
}

/// Handed to the session that owns a freshly registered connection.
#[derive(Debug, Clone)]
pub struct Registration {
    pub id: ConnectionId,
    /// Cancelled when the server closes this connection.
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct ConnectionEntry {
    remote: SocketAddr,
    state: ConnectionState,
    cancel: CancellationToken,
    opened_at: Instant,
}

#[derive(Debug)]
struct Registry {
    entries: HashMap<ConnectionId, ConnectionEntry>,
    accepting: bool,
}

impl Registry {
    fn ready_count(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| entry.state == ConnectionState::Ready)
            .count()
    }
}

/// Registry of live connections.
#[derive(Debug)]
pub struct ConnectionManager {
    registry: Mutex<Registry>,
    ids: ConnectionIdAllocator,
    events: broadcast::Sender<ConnectionEvent>,
    connectivity: watch::Sender<usize>,
}

impl ConnectionManager {
    /// Creates an empty registry that is not yet accepting connections.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (connectivity, _) = watch::channel(0);
        Self {
            registry: Mutex::new(Registry {
                entries: HashMap::new(),
                accepting: false,
            }),
            ids: ConnectionIdAllocator::new(),
            events,
            connectivity,
        }
    }

    /// Opens or closes the registry to new connections.
    pub async fn set_accepting(&self, accepting: bool) {
        self.registry.lock().await.accepting = accepting;
        debug!(accepting, "connection registry accepting flag changed");
    }

    pub async fn is_accepting(&self) -> bool {
        self.registry.lock().await.accepting
    }

    /// Registers a new connection in the `Connecting` state.
    ///
    /// `parent` is the server's run token; the connection's token is a
    /// child of it so stopping the server reaches every session.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotAccepting`] while the server is stopping
    /// or stopped.
    pub async fn register(
        &self,
        remote: SocketAddr,
        parent: &CancellationToken,
    ) -> Result<Registration, RegistryError> {
        let mut registry = self.registry.lock().await;
        if !registry.accepting {
            warn!(%remote, "rejecting connection: registry not accepting");
            return Err(RegistryError::NotAccepting);
        }

        let id = self.ids.allocate();
        let cancel = parent.child_token();
        registry.entries.insert(
            id,
            ConnectionEntry {
                remote,
                state: ConnectionState::Connecting,
                cancel: cancel.clone(),
                opened_at: Instant::now(),
            },
        );
        self.emit(id, remote, ConnectionState::Connecting);
        info!(%id, %remote, total = registry.entries.len(), "connection registered");
        Ok(Registration { id, cancel })
    }

    /// Moves a connection to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownConnection`] if the id is not
    /// registered (for example after `close_all`), or
    /// [`RegistryError::InvalidTransition`] for a backward move.
    pub async fn transition(
        &self,
        id: ConnectionId,
        next: ConnectionState,
    ) -> Result<(), RegistryError> {
        let mut registry = self.registry.lock().await;
        let entry = registry
            .entries
            .get_mut(&id)
            .ok_or(RegistryError::UnknownConnection(id))?;
        if !entry.state.can_transition_to(next) {
            return Err(RegistryError::InvalidTransition {
                id,
                from: entry.state,
                to: next,
            });
        }
        let from = entry.state;
        entry.state = next;
        let remote = entry.remote;

        self.emit(id, remote, next);
        self.publish_count(registry.ready_count());
        debug!(%id, %from, to = %next, "connection state changed");
        Ok(())
    }

    /// Removes a connection and marks it `Closed`.
    ///
    /// Returns `true` only for the call that actually removed the entry, so
    /// racing closers never decrement the count twice.
    pub async fn unregister(&self, id: ConnectionId) -> bool {
        let mut registry = self.registry.lock().await;
        let Some(entry) = registry.entries.remove(&id) else {
            return false;
        };
        entry.cancel.cancel();

        self.emit(id, entry.remote, ConnectionState::Closed);
        let ready = registry.ready_count();
        self.publish_count(ready);
        info!(
            %id,
            remote = %entry.remote,
            open_for_ms = entry.opened_at.elapsed().as_millis() as u64,
            ready,
            "connection closed"
        );
        true
    }

    /// Stops accepting, cancels every connection, and clears the map under
    /// a single lock acquisition.  Returns how many entries were dropped.
    pub async fn close_all(&self) -> usize {
        let mut registry = self.registry.lock().await;
        registry.accepting = false;
        let drained: Vec<_> = registry.entries.drain().collect();
        for (id, entry) in &drained {
            entry.cancel.cancel();
            self.emit(*id, entry.remote, ConnectionState::Closed);
        }
        self.publish_count(0);
        if !drained.is_empty() {
            info!(closed = drained.len(), "closed all connections");
        }
        drained.len()
    }

    /// Number of connections in the `Ready` state.
    pub async fn count(&self) -> usize {
        self.registry.lock().await.ready_count()
    }

    /// Number of registered connections in any state.
    pub async fn len(&self) -> usize {
        self.registry.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn state_of(&self, id: ConnectionId) -> Option<ConnectionState> {
        self.registry
            .lock()
            .await
            .entries
            .get(&id)
            .map(|entry| entry.state)
    }

    /// All registered connections, ordered by id.
    pub async fn snapshot(&self) -> Vec<ConnectionInfo> {
        let registry = self.registry.lock().await;
        let mut infos: Vec<_> = registry
            .entries
            .iter()
            .map(|(id, entry)| ConnectionInfo {
                id: *id,
                remote: entry.remote,
                state: entry.state,
                opened_at: entry.opened_at,
            })
            .collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Watch channel carrying the number of Ready connections.
    pub fn connectivity(&self) -> watch::Receiver<usize> {
        self.connectivity.subscribe()
    }

    fn emit(&self, id: ConnectionId, remote: SocketAddr, state: ConnectionState) {
        // No subscribers is fine.
        let _ = self.events.send(ConnectionEvent { id, remote, state });
    }

    fn publish_count(&self, ready: usize) {
        self.connectivity.send_if_modified(|current| {
            if *current == ready {
                false
            } else {
                *current = ready;
                true
            }
        });
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
