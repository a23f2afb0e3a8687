//! Infrastructure layer for the host.
//!
//! Contains OS-facing adapters: TCP sockets, DNS-SD advertisement, action
//! executors, file-system storage, and the UI bridge.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `podremote_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod actions;
pub mod discovery;
pub mod network;
pub mod storage;
pub mod ui_bridge;
