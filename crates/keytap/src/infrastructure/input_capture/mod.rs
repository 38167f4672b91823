//! Global keyboard hook adapters.
//!
//! Each platform backend installs one system-wide keyboard intercept on a
//! dedicated thread and pushes [`RawKeyEvent`]s into a [`RawEventSink`]. The
//! sink is the sending half of an unbounded `std::sync::mpsc` channel, so the
//! OS callback never waits on the engine.
//!
//! # Layers
//!
//! - [`HookBackend`] / [`ActiveHook`]: the per-platform seam. `open` either
//!   returns a live hook or fails cleanly; `release` is the only way to tear
//!   one down.
//! - [`HookAdapter`]: the `Uninstalled → Installed → Uninstalled` state
//!   machine shared by every backend. `install` while installed returns the
//!   existing handle; `uninstall` with a stale handle is a no-op.
//!
//! # Testability
//!
//! [`mock::MockBackend`] is always compiled so that tests (and downstream
//! users) can inject synthetic events without OS privileges.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard, PoisonError};

use keytap_core::RawKeyCode;
use tracing::{debug, info};

pub mod mock;

#[cfg(target_os = "linux")]
pub mod linux;
#[cfg(target_os = "macos")]
pub mod macos;
#[cfg(target_os = "windows")]
pub mod windows;

use crate::application::capture_engine::EngineConfig;

/// One raw key transition, as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub code: RawKeyCode,
    pub is_key_up: bool,
    /// The platform flagged this key-down as auto-repeat.
    pub is_repeat: bool,
}

impl RawKeyEvent {
    pub fn down(code: RawKeyCode) -> Self {
        Self { code, is_key_up: false, is_repeat: false }
    }

    pub fn up(code: RawKeyCode) -> Self {
        Self { code, is_key_up: true, is_repeat: false }
    }

    pub fn repeat(code: RawKeyCode) -> Self {
        Self { code, is_key_up: false, is_repeat: true }
    }
}

/// Sending half of the hook → engine hand-off queue.
#[derive(Debug, Clone)]
pub struct RawEventSink {
    tx: Sender<RawKeyEvent>,
}

impl RawEventSink {
    /// Queues `event` without blocking.
    ///
    /// Returns `false` once the receiving side has gone away.
    pub fn emit(&self, event: RawKeyEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Creates a connected sink/receiver pair.
pub fn raw_channel() -> (RawEventSink, Receiver<RawKeyEvent>) {
    let (tx, rx) = mpsc::channel();
    (RawEventSink { tx }, rx)
}

/// The OS refused to grant global keyboard capture.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HookInstallError {
    #[error("permission denied for global keyboard capture: {0}")]
    PermissionDenied(String),
    #[error("keyboard hook channel already owned: {0}")]
    ChannelOccupied(String),
    #[error("no readable keyboard device found")]
    NoKeyboardDevice,
    #[error("failed to spawn hook thread: {0}")]
    ThreadSpawn(String),
    #[error("global keyboard capture is not supported on {0}")]
    Unsupported(String),
}

/// A live OS hook. Dropping it without calling `release` leaks the hook.
pub trait ActiveHook: Send {
    /// Removes the hook and frees its OS resources.
    fn release(self: Box<Self>);
}

/// Platform seam: installs one global keyboard intercept.
#[cfg_attr(test, mockall::automock)]
pub trait HookBackend: Send + Sync + 'static {
    /// Installs the hook. Every key transition is pushed into `sink` until the
    /// returned hook is released.
    fn open(&self, sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError>;
}

/// Identifies one successful `install`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookHandle(u64);

impl HookHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

struct InstalledHook {
    handle: HookHandle,
    hook: Box<dyn ActiveHook>,
}

/// Idempotent install/uninstall on top of a [`HookBackend`].
pub struct HookAdapter<B: HookBackend> {
    backend: B,
    installed: Mutex<Option<InstalledHook>>,
    next_id: AtomicU64,
}

impl<B: HookBackend> HookAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            installed: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Installs the global hook, forwarding events into `sink`.
    ///
    /// If a hook is already installed its handle is returned and `sink` is
    /// dropped; no second OS hook is created.
    ///
    /// # Errors
    ///
    /// Propagates the backend's [`HookInstallError`]. On error nothing is
    /// installed.
    pub fn install(&self, sink: RawEventSink) -> Result<HookHandle, HookInstallError> {
        let mut installed = self.lock();
        if let Some(existing) = installed.as_ref() {
            debug!(handle = existing.handle.id(), "hook already installed");
            return Ok(existing.handle);
        }

        let hook = self.backend.open(sink)?;
        let handle = HookHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        *installed = Some(InstalledHook { handle, hook });
        info!(handle = handle.id(), "keyboard hook installed");
        Ok(handle)
    }

    /// Releases the hook identified by `handle`.
    ///
    /// A stale handle, or a second call for the same handle, does nothing.
    pub fn uninstall(&self, handle: HookHandle) {
        let taken = {
            let mut installed = self.lock();
            match installed.as_ref() {
                Some(current) if current.handle == handle => installed.take(),
                _ => None,
            }
        };

        match taken {
            Some(current) => {
                current.hook.release();
                info!(handle = handle.id(), "keyboard hook uninstalled");
            }
            None => debug!(handle = handle.id(), "uninstall ignored: hook not installed"),
        }
    }

    pub fn is_installed(&self) -> bool {
        self.lock().is_some()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, Option<InstalledHook>> {
        self.installed.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Backend for targets without a global keyboard hook.
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl HookBackend for UnsupportedBackend {
    fn open(&self, _sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError> {
        Err(HookInstallError::Unsupported(std::env::consts::OS.to_string()))
    }
}

#[cfg(target_os = "windows")]
pub type PlatformBackend = windows::WindowsHook;
#[cfg(target_os = "linux")]
pub type PlatformBackend = linux::EvdevHook;
#[cfg(target_os = "macos")]
pub type PlatformBackend = macos::EventTapHook;
#[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
pub type PlatformBackend = UnsupportedBackend;

/// Builds the backend for the current OS.
#[allow(unused_variables)]
pub fn platform_backend(config: &EngineConfig) -> PlatformBackend {
    #[cfg(target_os = "windows")]
    {
        windows::WindowsHook::new()
    }

    #[cfg(target_os = "linux")]
    {
        linux::EvdevHook::new(config.device.clone())
    }

    #[cfg(target_os = "macos")]
    {
        macos::EventTapHook::new()
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        UnsupportedBackend
    }
}
