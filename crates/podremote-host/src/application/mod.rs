//! Application layer use cases for the host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure types in `podremote-core`) and the infrastructure (sockets, mDNS,
//! the OS).  Code here:
//!
//! - **Decides** what a command means: which reply to send and which host
//!   action to trigger.
//! - **Depends on abstractions** (the [`ActionExecutor`](execute_action::ActionExecutor)
//!   trait) rather than on concrete OS integrations.
//! - **Contains no network I/O**, so it is tested with plain function calls.
//!
//! # Sub-modules
//!
//! - **`execute_action`** – The `ActionExecutor` port and the [`Action`](execute_action::Action)
//!   values that are applied to it.
//! - **`dispatch_command`** – Maps a parsed `Command` to a `Reply` plus an
//!   optional, possibly delayed, effect.

pub mod dispatch_command;
pub mod execute_action;
