//! Service discovery: announcing the host on the local network.
//!
//! # How does a remote find the host? (for beginners)
//!
//! Multicast DNS service discovery (DNS-SD, "Bonjour") lets a device ask
//! "who offers `_ipodsync._tcp` on `local.`?" and get back an instance name,
//! a host name, addresses, and a port.  The host publishes one such record
//! while its listener is running and withdraws it when it stops.
//!
//! # Sub-modules
//!
//! - **`mdns`** – `MdnsAdvertiser`, backed by the `mdns-sd` daemon.
//! - **`memory`** – `InMemoryAdvertiser`, which only remembers what it was
//!   asked to publish.  Used by tests.
//!
//! Both keep at most one live record: publishing a record for a new port
//! withdraws the previous one first.

use podremote_core::ServiceRecord;
use thiserror::Error;

pub mod mdns;
pub mod memory;

/// Errors from publishing or withdrawing a record.
///
/// These are never fatal for the server: the listener keeps serving direct
/// connections even when nobody can discover it.
#[derive(Debug, Error)]
pub enum AdvertiseError {
    #[error("mDNS daemon error: {0}")]
    Daemon(String),
    #[error("could not determine host name: {0}")]
    Hostname(#[source] std::io::Error),
    #[error("invalid service record: {0}")]
    InvalidRecord(String),
    #[error("publish rejected: {0}")]
    Rejected(String),
}

/// Proof that a record is live; pass it back to [`Advertiser::withdraw`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementHandle {
    record: ServiceRecord,
    fullname: String,
}

impl AdvertisementHandle {
    pub fn new(record: ServiceRecord) -> Self {
        let fullname = full_name(&record);
        Self { record, fullname }
    }

    pub fn record(&self) -> &ServiceRecord {
        &self.record
    }

    /// `<instance>.<type>.<domain>.`, the DNS-SD instance name.
    pub fn fullname(&self) -> &str {
        &self.fullname
    }
}

/// Publishes and withdraws the host's service record.
pub trait Advertiser: Send + Sync {
    /// Makes `record` discoverable.
    ///
    /// Publishing the record that is already live returns its handle
    /// unchanged.
    fn publish(&self, record: ServiceRecord) -> Result<AdvertisementHandle, AdvertiseError>;

    /// Removes a record published earlier.  Withdrawing a record that is no
    /// longer live is a no-op.
    fn withdraw(&self, handle: AdvertisementHandle) -> Result<(), AdvertiseError>;
}

fn full_name(record: &ServiceRecord) -> String {
    format!("{}.{}", record.instance_name, record.service_domain())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_fullname_joins_instance_and_domain() {
        let handle = AdvertisementHandle::new(ServiceRecord::default());
        assert_eq!(handle.fullname(), "MacController._ipodsync._tcp.local.");
        assert_eq!(handle.record().port, 50505);
    }
}
