//! The advertised service record and the port selection policy.
//!
//! # What is a service record? (for beginners)
//!
//! DNS Service Discovery (DNS-SD, also known as Bonjour or Zeroconf) lets a
//! device announce "I offer service *X* on port *P*" to every peer on the
//! same network segment, using multicast DNS instead of a central server.
//! The announcement contains:
//!
//! - a **service type** such as `_ipodsync._tcp` (what kind of service),
//! - an **instance name** such as `MacController` (which one, human readable),
//! - a **domain**, always `local` for multicast DNS,
//! - the **port** to connect to.
//!
//! A [`ServiceRecord`] is immutable once published.  When the port changes
//! (ephemeral-port mode after a restart) a new record is built and the old
//! one is withdrawn.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default DNS-SD service type understood by companion devices.
pub const DEFAULT_SERVICE_TYPE: &str = "_ipodsync._tcp";

/// Default human-readable instance name.
pub const DEFAULT_INSTANCE_NAME: &str = "MacController";

/// Multicast DNS domain.
pub const DEFAULT_DOMAIN: &str = "local";

/// Well-known TCP port companion devices try first.
pub const DEFAULT_PORT: u16 = 50505;

/// A discoverable service record: name, type, domain, and TCP port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// DNS-SD service type, e.g. `_ipodsync._tcp` (no trailing dot).
    pub service_type: String,
    /// Human-readable instance name, e.g. `MacController`.
    pub instance_name: String,
    /// Domain, normally `local` (no trailing dot).
    pub domain: String,
    /// TCP port the listener is bound to.
    pub port: u16,
}

impl ServiceRecord {
    /// Builds a record for `port` using the given identity.
    pub fn new(
        service_type: impl Into<String>,
        instance_name: impl Into<String>,
        domain: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_type: service_type.into(),
            instance_name: instance_name.into(),
            domain: domain.into(),
            port,
        }
    }

    /// Returns a copy of this record advertising a different port.
    pub fn with_port(&self, port: u16) -> Self {
        Self {
            port,
            ..self.clone()
        }
    }

    /// Fully qualified service domain, e.g. `_ipodsync._tcp.local.`.
    ///
    /// Trailing dots on the configured parts are tolerated so that both
    /// `local` and `local.` produce the same result.
    pub fn service_domain(&self) -> String {
        format!(
            "{}.{}.",
            self.service_type.trim_end_matches('.'),
            self.domain.trim_end_matches('.')
        )
    }
}

impl Default for ServiceRecord {
    fn default() -> Self {
        Self::new(
            DEFAULT_SERVICE_TYPE,
            DEFAULT_INSTANCE_NAME,
            DEFAULT_DOMAIN,
            DEFAULT_PORT,
        )
    }
}

impl fmt::Display for ServiceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) on port {}",
            self.instance_name,
            self.service_domain(),
            self.port
        )
    }
}

/// Which port the listener should bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PortSpec {
    /// Bind exactly this port; fail if it is unavailable.
    Fixed(u16),
    /// Let the OS pick any free port; the chosen port is advertised.
    Ephemeral,
}

impl PortSpec {
    /// The port number to pass to `bind` (`0` asks the OS to choose).
    pub fn as_bind_port(self) -> u16 {
        match self {
            PortSpec::Fixed(port) => port,
            PortSpec::Ephemeral => 0,
        }
    }
}

impl From<u16> for PortSpec {
    /// `0` means "any available port", like the socket API.
    fn from(port: u16) -> Self {
        if port == 0 {
            PortSpec::Ephemeral
        } else {
            PortSpec::Fixed(port)
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortSpec::Fixed(port) => write!(f, "{port}"),
            PortSpec::Ephemeral => f.write_str("<ephemeral>"),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
