//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module handles:
//!
//! - Reading the TOML configuration file from a given path or from the
//!   platform-appropriate directory.
//! - Writing the configuration back to disk.
//! - Providing defaults when the file (or any field in it) is missing.
//! - Converting the on-disk settings into the runtime `ServerConfig`.

pub mod config;
