//! Network infrastructure for the host.
//!
//! # Sub-modules
//!
//! - **`listener`** – Binds the TCP port (fixed or OS-chosen) with
//!   `SO_REUSEADDR` and yields inbound connections.
//!
//! - **`connection_manager`** – The keyed registry of live connections, their
//!   lifecycle state, and the "how many are connected?" watch channel.
//!
//! - **`session`** – Runs the line protocol on one connection: framing,
//!   parsing, dispatch, one reply per command, then the effect.
//!
//! - **`server`** – Ties the above together: start/stop lifecycle, the
//!   accept loop, advertisement, and state observation for the UI.

pub mod connection_manager;
pub mod listener;
pub mod server;
pub mod session;
