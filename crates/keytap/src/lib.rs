//! keytap library entry point.
//!
//! Global keyboard key-down/key-up capture. The process-wide API is two
//! functions:
//!
//! ```no_run
//! keytap::start(|event| println!("{} {} {}", event.key, event.is_key_up, event.key_code))?;
//! // ...
//! keytap::stop();
//! # Ok::<(), keytap::HookInstallError>(())
//! ```
//!
//! Both operate on one lazily created [`CaptureEngine`] bound to the current
//! platform's hook backend. Call [`init`] first to configure it; otherwise the
//! first `start` uses [`EngineConfig::default`]. Code that wants its own
//! engine (tests, or a different backend) can build a [`CaptureEngine`]
//! directly.

use std::sync::OnceLock;

use tokio::sync::mpsc::UnboundedReceiver;

pub mod application;
pub mod infrastructure;

pub use application::capture_engine::{CaptureEngine, EngineConfig, EngineState, ListenerHandle};
pub use application::dispatch::RepeatPolicy;
pub use infrastructure::input_capture::{HookInstallError, PlatformBackend};
pub use keytap_core::{KeyEvent, KEY_TABLE_VERSION};

static ENGINE: OnceLock<CaptureEngine<PlatformBackend>> = OnceLock::new();

fn build_engine(config: EngineConfig) -> CaptureEngine<PlatformBackend> {
    let backend = infrastructure::input_capture::platform_backend(&config);
    CaptureEngine::new(backend, config)
}

fn engine() -> &'static CaptureEngine<PlatformBackend> {
    ENGINE.get_or_init(|| build_engine(EngineConfig::default()))
}

/// Configures the process-wide engine.
///
/// Returns `false` (and changes nothing) if the engine already exists,
/// i.e. after an earlier `init` or `start`.
pub fn init(config: EngineConfig) -> bool {
    let mut created = false;
    ENGINE.get_or_init(|| {
        created = true;
        build_engine(config)
    });
    created
}

/// Registers `callback` for every global key transition until [`stop`].
///
/// The first call installs the OS hook; later calls share it.
///
/// # Errors
///
/// [`HookInstallError`] if the OS refuses global keyboard capture. In that
/// case nothing is registered.
pub fn start<F>(callback: F) -> Result<ListenerHandle, HookInstallError>
where
    F: Fn(&KeyEvent) + Send + Sync + 'static,
{
    engine().start(callback)
}

/// Removes every listener and releases the OS hook. No-op when not running.
pub fn stop() {
    if let Some(engine) = ENGINE.get() {
        engine.stop();
    }
}

/// `true` between a successful [`start`] and the next [`stop`].
pub fn is_running() -> bool {
    ENGINE.get().is_some_and(|engine| engine.is_running())
}

/// Starts capture with a listener that feeds a `tokio` channel.
///
/// # Errors
///
/// Same as [`start`].
pub fn event_channel() -> Result<(ListenerHandle, UnboundedReceiver<KeyEvent>), HookInstallError> {
    engine().event_channel()
}
