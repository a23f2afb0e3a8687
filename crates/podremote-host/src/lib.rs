//! podremote-host library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the host do? (for beginners)
//!
//! The host is the machine being *remote controlled*.  It:
//!
//! 1. Binds a TCP port on every network interface.
//! 2. Advertises `MacController._ipodsync._tcp.local.` via multicast DNS so a
//!    companion device can find it without typing an IP address.
//! 3. Accepts any number of simultaneous connections and runs the text
//!    command protocol on each one.
//! 4. Forwards each command to an [`ActionExecutor`](application::execute_action::ActionExecutor)
//!    that produces the real effect (power off, key press, speech, volume).
//! 5. Reports "is anything connected?" and the server state to the UI.

/// Application layer: command dispatch and the action executor port.
pub mod application;

/// Infrastructure layer: sockets, discovery, executors, config, UI bridge.
pub mod infrastructure;
