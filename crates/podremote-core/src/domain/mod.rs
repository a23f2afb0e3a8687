//! Domain entities shared by the host and its tests.
//!
//! - **`service`** – The DNS-SD record advertised on the LAN and the port
//!   selection policy used when binding.
//! - **`connection`** – Connection identifiers and the lifecycle state machine.
//! - **`volume`** – A system volume level clamped to `0..=100`.

pub mod connection;
pub mod service;
pub mod volume;
