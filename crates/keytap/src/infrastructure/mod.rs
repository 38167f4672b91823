//! Infrastructure layer: OS-facing adapters.
//!
//! Contains the global keyboard hook backends and configuration file loading.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `keytap_core`, but MUST NOT be imported by `keytap_core`.

pub mod input_capture;
pub mod storage;
