//! Action executors and the effect scheduler.
//!
//! # Sub-modules
//!
//! - **`logging`** – `LoggingExecutor`, a dry-run executor that logs each
//!   action (with the platform key code for key presses) instead of
//!   touching the OS.  The binary uses it unless an embedding application
//!   supplies a real integration.
//!
//! - **`recording`** – `RecordingExecutor`, which records every call in
//!   order and tracks a simulated volume level.  Tests assert against it.
//!
//! - **`scheduler`** – `EffectRunner`, which runs a dispatched effect after
//!   its delay on Tokio's blocking pool, or fires the exit token, and the
//!   per-connection `EffectLane` that keeps immediate effects in order.

pub mod logging;
pub mod recording;
pub mod scheduler;
