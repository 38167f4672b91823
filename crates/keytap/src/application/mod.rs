//! Application layer: the capture engine and its dispatch machinery.
//!
//! Nothing here talks to the OS directly. The engine depends on the
//! [`HookBackend`](crate::infrastructure::input_capture::HookBackend) trait,
//! so every use case runs unchanged against the mock backend in tests.
//!
//! # Sub-modules
//!
//! - **`capture_engine`** – `start`/`stop` lifecycle, the listener registry
//!   and the per-session dispatcher thread.
//! - **`dispatch`** – key-repeat filtering and panic-isolated listener calls.
//! - **`stream`** – adapter from listener callbacks to a `tokio` channel.

pub mod capture_engine;
pub mod dispatch;
pub mod stream;
