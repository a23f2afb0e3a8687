//! InMemoryAdvertiser: remembers publishes and withdrawals, sends nothing.

use std::sync::{Mutex, MutexGuard, PoisonError};

use podremote_core::ServiceRecord;

use super::{AdvertiseError, AdvertisementHandle, Advertiser};

#[derive(Debug, Default)]
struct State {
    current: Option<AdvertisementHandle>,
    published: Vec<ServiceRecord>,
    withdrawn: Vec<ServiceRecord>,
    failing: bool,
}

/// Advertiser for tests; optionally fails every publish.
#[derive(Debug, Default)]
pub struct InMemoryAdvertiser {
    state: Mutex<State>,
}

impl InMemoryAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }

    /// When `true`, `publish` returns [`AdvertiseError::Rejected`].
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    /// The record that is live right now.
    pub fn current(&self) -> Option<ServiceRecord> {
        self.lock().current.as_ref().map(|h| h.record().clone())
    }

    /// Every record published, oldest first.
    pub fn published(&self) -> Vec<ServiceRecord> {
        self.lock().published.clone()
    }

    /// Every record withdrawn, oldest first.
    pub fn withdrawn(&self) -> Vec<ServiceRecord> {
        self.lock().withdrawn.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Advertiser for InMemoryAdvertiser {
    fn publish(&self, record: ServiceRecord) -> Result<AdvertisementHandle, AdvertiseError> {
        let mut state = self.lock();
        if state.failing {
            return Err(AdvertiseError::Rejected("advertiser set to fail".into()));
        }
        if let Some(current) = &state.current {
            if current.record() == &record {
                return Ok(current.clone());
            }
        }
        if let Some(previous) = state.current.take() {
            state.withdrawn.push(previous.record().clone());
        }
        let handle = AdvertisementHandle::new(record.clone());
        state.published.push(record);
        state.current = Some(handle.clone());
        Ok(handle)
    }

    fn withdraw(&self, handle: AdvertisementHandle) -> Result<(), AdvertiseError> {
        let mut state = self.lock();
        if state.current.as_ref() == Some(&handle) {
            state.current = None;
            state.withdrawn.push(handle.record().clone());
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
