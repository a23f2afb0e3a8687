//! Listener: the bound TCP socket that yields inbound connections.

use std::io;
use std::net::{IpAddr, SocketAddr};

use podremote_core::PortSpec;
use thiserror::Error;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tracing::info;

/// Pending-connection queue length passed to `listen`.
const LISTEN_BACKLOG: u32 = 128;

/// The listening socket could not be created.
#[derive(Debug, Error)]
#[error("bind failed on {addr}: {source}")]
pub struct BindError {
    pub addr: SocketAddr,
    #[source]
    pub source: io::Error,
}

/// A bound, listening TCP socket.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Binds `bind_address:port` with `SO_REUSEADDR` so a quick restart does
    /// not trip over sockets lingering in `TIME_WAIT`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError`] when the socket cannot be created, configured,
    /// bound, or put into listening mode (most often: port already in use).
    pub fn bind(bind_address: IpAddr, port: PortSpec) -> Result<Self, BindError> {
        let addr = SocketAddr::new(bind_address, port.as_bind_port());
        let with_addr = |source: io::Error| BindError { addr, source };

        let socket = match bind_address {
            IpAddr::V4(_) => TcpSocket::new_v4(),
            IpAddr::V6(_) => TcpSocket::new_v6(),
        }
        .map_err(with_addr)?;
        socket.set_reuseaddr(true).map_err(with_addr)?;
        socket.bind(addr).map_err(with_addr)?;
        let inner = socket.listen(LISTEN_BACKLOG).map_err(with_addr)?;
        let local_addr = inner.local_addr().map_err(with_addr)?;

        info!(requested = %port, %local_addr, "listener bound");
        Ok(Self { inner, local_addr })
    }

    /// The port actually bound (the OS-chosen one for [`PortSpec::Ephemeral`]).
    pub fn local_port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Waits for the next inbound connection.
    pub async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        self.inner.accept().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
