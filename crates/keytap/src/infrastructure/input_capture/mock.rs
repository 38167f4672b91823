//! In-process hook backend for tests.
//!
//! Stands in for an OS hook: `inject` plays the role of the hook callback.
//! Clones share state, so a test can keep one clone and hand the other to the
//! engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use keytap_core::RawKeyCode;

use super::{ActiveHook, HookBackend, HookInstallError, RawEventSink, RawKeyEvent};

#[derive(Default)]
struct Shared {
    sink: Mutex<Option<RawEventSink>>,
    install_error: Mutex<Option<HookInstallError>>,
    opens: AtomicUsize,
    releases: AtomicUsize,
}

/// A [`HookBackend`] driven by `inject` calls instead of the OS.
#[derive(Clone, Default)]
pub struct MockBackend {
    shared: Arc<Shared>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `open` fail with `error` (`None` restores success).
    pub fn set_install_error(&self, error: Option<HookInstallError>) {
        *lock(&self.shared.install_error) = error;
    }

    /// Pushes a raw event, as if the OS reported it.
    ///
    /// Returns `false` when no hook is open or the engine side has gone away.
    pub fn inject_event(&self, event: RawKeyEvent) -> bool {
        match lock(&self.shared.sink).as_ref() {
            Some(sink) => sink.emit(event),
            None => false,
        }
    }

    /// Shorthand for a key-down (`is_key_up == false`) or key-up event.
    pub fn inject(&self, code: RawKeyCode, is_key_up: bool) -> bool {
        self.inject_event(RawKeyEvent { code, is_key_up, is_repeat: false })
    }

    /// Shorthand for a platform-flagged auto-repeat key-down.
    pub fn inject_repeat(&self, code: RawKeyCode) -> bool {
        self.inject_event(RawKeyEvent::repeat(code))
    }

    pub fn is_open(&self) -> bool {
        lock(&self.shared.sink).is_some()
    }

    /// Number of successful `open` calls.
    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }

    /// Number of `release` calls.
    pub fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }
}

impl HookBackend for MockBackend {
    fn open(&self, sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError> {
        if let Some(error) = lock(&self.shared.install_error).clone() {
            return Err(error);
        }
        *lock(&self.shared.sink) = Some(sink);
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockHook {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct MockHook {
    shared: Arc<Shared>,
}

impl ActiveHook for MockHook {
    fn release(self: Box<Self>) {
        // Dropping the sink disconnects the dispatcher's receiver.
        lock(&self.shared.sink).take();
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::raw_channel;

    #[test]
    fn test_open_and_inject_delivers_to_receiver() {
        // Arrange
        let backend = MockBackend::new();
        let (sink, rx) = raw_channel();
        let _hook = backend.open(sink).expect("open should succeed");

        // Act
        let delivered = backend.inject(RawKeyCode::Windows(0x41), false);

        // Assert
        assert!(delivered);
        assert_eq!(rx.recv().unwrap(), RawKeyEvent::down(RawKeyCode::Windows(0x41)));
    }

    #[test]
    fn test_inject_before_open_returns_false() {
        let backend = MockBackend::new();
        assert!(!backend.inject(RawKeyCode::Windows(0x41), false));
    }

    #[test]
    fn test_release_closes_channel_and_counts() {
        // Arrange
        let backend = MockBackend::new();
        let (sink, rx) = raw_channel();
        let hook = backend.open(sink).unwrap();

        // Act
        hook.release();

        // Assert
        assert!(rx.recv().is_err(), "channel should be closed after release");
        assert!(!backend.is_open());
        assert_eq!(backend.open_count(), 1);
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn test_configured_error_fails_open_without_counting() {
        // Arrange
        let backend = MockBackend::new();
        backend.set_install_error(Some(HookInstallError::NoKeyboardDevice));

        // Act
        let result = backend.open(raw_channel().0);

        // Assert
        assert_eq!(result.err(), Some(HookInstallError::NoKeyboardDevice));
        assert_eq!(backend.open_count(), 0);
        assert!(!backend.is_open());
    }

    #[test]
    fn test_clones_share_state() {
        let backend = MockBackend::new();
        let observer = backend.clone();
        let (sink, rx) = raw_channel();
        let _hook = backend.open(sink).unwrap();

        assert!(observer.inject_repeat(RawKeyCode::MacOs(0x00)));
        assert!(rx.recv().unwrap().is_repeat);
        assert_eq!(observer.open_count(), 1);
    }
}
