//! Storage infrastructure: read-only configuration file access.
//!
//! The `config` sub-module locates `keytap/config.toml` in the platform config
//! directory (or `$KEYTAP_CONFIG`) and falls back to defaults when the file is
//! absent.

pub mod config;
