//! MdnsAdvertiser: publishes the service record with the `mdns-sd` daemon.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use mdns_sd::{ServiceDaemon, ServiceInfo};
use podremote_core::ServiceRecord;
use tracing::{debug, info, warn};

use super::{AdvertiseError, AdvertisementHandle, Advertiser};

/// TXT key naming the wire protocol.
pub const TXT_PROTOCOL: &str = "proto";
/// TXT value for the line protocol.
pub const TXT_PROTOCOL_VALUE: &str = "podremote-line";
/// TXT key carrying the host version.
pub const TXT_VERSION: &str = "version";

#[derive(Default)]
struct State {
    daemon: Option<ServiceDaemon>,
    current: Option<AdvertisementHandle>,
}

/// Advertiser backed by a multicast DNS responder.
///
/// The daemon thread is started on the first `publish`, so a host whose
/// network refuses multicast still serves direct connections.
#[derive(Default)]
pub struct MdnsAdvertiser {
    state: Mutex<State>,
}

impl MdnsAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Withdraws the live record and stops the daemon thread.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        let Some(daemon) = state.daemon.take() else {
            return;
        };
        if let Some(handle) = state.current.take() {
            unregister(&daemon, &handle);
        }
        match daemon.shutdown() {
            Ok(_) => info!("mDNS daemon stopped"),
            Err(e) => warn!(error = %e, "mDNS daemon shutdown failed"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Advertiser for MdnsAdvertiser {
    fn publish(&self, record: ServiceRecord) -> Result<AdvertisementHandle, AdvertiseError> {
        let mut state = self.lock();
        if let Some(current) = &state.current {
            if current.record() == &record {
                return Ok(current.clone());
            }
        }

        let daemon = match &state.daemon {
            Some(daemon) => daemon.clone(),
            None => {
                let daemon =
                    ServiceDaemon::new().map_err(|e| AdvertiseError::Daemon(e.to_string()))?;
                debug!("mDNS daemon started");
                state.daemon = Some(daemon.clone());
                daemon
            }
        };

        if let Some(previous) = state.current.take() {
            unregister(&daemon, &previous);
        }

        let info = service_info(&record)?;
        daemon
            .register(info)
            .map_err(|e| AdvertiseError::Daemon(e.to_string()))?;

        let handle = AdvertisementHandle::new(record);
        info!(
            service = handle.fullname(),
            port = handle.record().port,
            "service published"
        );
        state.current = Some(handle.clone());
        Ok(handle)
    }

    fn withdraw(&self, handle: AdvertisementHandle) -> Result<(), AdvertiseError> {
        let mut state = self.lock();
        if state.current.as_ref() != Some(&handle) {
            debug!(service = handle.fullname(), "withdraw of a record that is not live");
            return Ok(());
        }
        state.current = None;
        if let Some(daemon) = &state.daemon {
            daemon
                .unregister(handle.fullname())
                .map_err(|e| AdvertiseError::Daemon(e.to_string()))?;
            info!(service = handle.fullname(), "service withdrawn");
        }
        Ok(())
    }
}

fn unregister(daemon: &ServiceDaemon, handle: &AdvertisementHandle) {
    match daemon.unregister(handle.fullname()) {
        Ok(_) => info!(service = handle.fullname(), "service withdrawn"),
        Err(e) => warn!(service = handle.fullname(), error = %e, "withdraw failed"),
    }
}

fn service_info(record: &ServiceRecord) -> Result<ServiceInfo, AdvertiseError> {
    let raw = hostname::get().map_err(AdvertiseError::Hostname)?;
    let host_name = mdns_host_name(&raw.to_string_lossy());
    let properties = HashMap::from([
        (TXT_PROTOCOL.to_string(), TXT_PROTOCOL_VALUE.to_string()),
        (TXT_VERSION.to_string(), env!("CARGO_PKG_VERSION").to_string()),
    ]);
    // Addresses are filled in by the daemon for every interface.
    let no_addresses: &[IpAddr] = &[];

    let info = ServiceInfo::new(
        &record.service_domain(),
        &record.instance_name,
        &host_name,
        no_addresses,
        record.port,
        properties,
    )
    .map_err(|e| AdvertiseError::InvalidRecord(e.to_string()))?;
    Ok(info.enable_addr_auto())
}

/// `Mac-mini`, `Mac-mini.local` and `Mac-mini.local.` all become
/// `Mac-mini.local.`.
fn mdns_host_name(raw: &str) -> String {
    let base = raw.trim_end_matches('.');
    let base = base.strip_suffix(".local").unwrap_or(base);
    format!("{base}.local.")
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mdns_host_name_normalises_suffix() {
        assert_eq!(mdns_host_name("Mac-mini"), "Mac-mini.local.");
        assert_eq!(mdns_host_name("Mac-mini.local"), "Mac-mini.local.");
        assert_eq!(mdns_host_name("Mac-mini.local."), "Mac-mini.local.");
    }

    #[test]
    fn test_service_info_uses_record_identity() {
        let record = ServiceRecord::default().with_port(50600);

        let info = service_info(&record).expect("service info");

        assert_eq!(info.get_fullname(), "MacController._ipodsync._tcp.local.");
        assert_eq!(info.get_port(), 50600);
        assert_eq!(
            info.get_property_val_str(TXT_PROTOCOL),
            Some(TXT_PROTOCOL_VALUE)
        );
    }

    #[test]
    fn test_shutdown_without_publish_is_noop() {
        MdnsAdvertiser::new().shutdown();
    }
}
