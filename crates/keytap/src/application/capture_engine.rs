//! CaptureEngine: process-wide keyboard capture lifecycle and dispatch.
//!
//! The engine owns the [`HookAdapter`] and the listener registry. Its state
//! is `Idle → Running → Idle`:
//!
//! - the first [`CaptureEngine::start`] installs the hook and spawns one
//!   dispatcher thread for the session;
//! - later `start` calls only add listeners, all sharing that one hook;
//! - [`CaptureEngine::stop`] removes every listener and releases the hook.
//!
//! # Dispatch
//!
//! ```text
//! OS hook thread ──RawKeyEvent──▶ mpsc ──▶ dispatcher thread
//!                                           ├─ RepeatFilter
//!                                           ├─ KeyTranslator
//!                                           └─ listeners, in registration order
//! ```
//!
//! Listeners run outside the engine lock on a snapshot of the registry, so a
//! listener may call `start` or `stop` itself. Every session has a generation
//! number; the dispatcher checks it before each listener call and drops
//! whatever is still queued once `stop` has bumped it. A `stop` from any other
//! thread also waits for the listener call in flight, so no callback runs
//! after it returns.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use keytap_core::{KeyEvent, KeyTranslator};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::dispatch::{invoke_isolated, Listener, RepeatFilter, RepeatPolicy};
use crate::infrastructure::input_capture::{
    raw_channel, HookAdapter, HookBackend, HookHandle, HookInstallError, RawKeyEvent,
};

/// Engine settings, read from the `[engine]` table of the config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub repeat_policy: RepeatPolicy,
    /// Linux only: read this evdev node instead of discovering keyboards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
}

/// Lifecycle state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    Idle,
    Running,
}

/// Opaque registration returned by `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerHandle(u64);

impl ListenerHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

struct Session {
    hook: HookHandle,
    dispatcher: JoinHandle<()>,
}

struct EngineInner {
    state: EngineState,
    listeners: Vec<(ListenerHandle, Listener)>,
    next_listener_id: u64,
    generation: u64,
    /// Generations with a listener call running right now.
    in_flight: HashSet<u64>,
    session: Option<Session>,
}

/// Global keyboard capture engine over a hook backend `B`.
pub struct CaptureEngine<B: HookBackend> {
    adapter: HookAdapter<B>,
    config: EngineConfig,
    inner: Arc<Mutex<EngineInner>>,
    call_finished: Arc<Condvar>,
}

impl<B: HookBackend> CaptureEngine<B> {
    pub fn new(backend: B, config: EngineConfig) -> Self {
        Self {
            adapter: HookAdapter::new(backend),
            config,
            inner: Arc::new(Mutex::new(EngineInner {
                state: EngineState::Idle,
                listeners: Vec::new(),
                next_listener_id: 1,
                generation: 0,
                in_flight: HashSet::new(),
                session: None,
            })),
            call_finished: Arc::new(Condvar::new()),
        }
    }

    /// Registers `callback` for every key transition until [`stop`](Self::stop).
    ///
    /// From `Idle` this installs the OS hook first. If that fails the error is
    /// returned, no listener is registered and the engine stays `Idle`. While
    /// `Running` the callback joins the existing session.
    ///
    /// # Errors
    ///
    /// [`HookInstallError`] when the OS refuses global keyboard capture, or
    /// [`HookInstallError::ThreadSpawn`] if the dispatcher cannot be started.
    pub fn start<F>(&self, callback: F) -> Result<ListenerHandle, HookInstallError>
    where
        F: Fn(&KeyEvent) + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);

        if inner.state == EngineState::Idle {
            let session = self.open_session(&mut inner)?;
            inner.session = Some(session);
            inner.state = EngineState::Running;
            info!(generation = inner.generation, "capture engine running");
        }

        let handle = ListenerHandle(inner.next_listener_id);
        inner.next_listener_id += 1;
        inner.listeners.push((handle, Arc::new(callback)));
        debug!(
            listener = handle.id(),
            listeners = inner.listeners.len(),
            "listener registered"
        );
        Ok(handle)
    }

    /// Removes every listener and releases the OS hook.
    ///
    /// No-op while `Idle`. Safe to call from inside a listener; events still
    /// queued for the stopped session are dropped. Called from any other
    /// thread, it returns only once the listener call in flight (if any) has
    /// returned.
    pub fn stop(&self) {
        let mut inner = lock(&self.inner);
        let Some(session) = inner.session.take() else {
            debug!("stop ignored: capture engine idle");
            return;
        };

        let stopped = inner.generation;
        inner.generation += 1;
        let removed = inner.listeners.len();
        inner.listeners.clear();
        inner.state = EngineState::Idle;

        // Released under the lock so a concurrent start cannot observe the old hook.
        self.adapter.uninstall(session.hook);

        if session.dispatcher.thread().id() != thread::current().id() {
            while inner.in_flight.contains(&stopped) {
                inner = self
                    .call_finished
                    .wait(inner)
                    .unwrap_or_else(PoisonError::into_inner);
            }
        }
        drop(inner);

        // Not joined: stop may be running on the dispatcher thread itself. The
        // dispatcher exits once the hook drops its sink.
        drop(session.dispatcher);
        info!(listeners = removed, "capture engine stopped");
    }

    pub fn state(&self) -> EngineState {
        lock(&self.inner).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        self.adapter.backend()
    }

    fn open_session(&self, inner: &mut EngineInner) -> Result<Session, HookInstallError> {
        let (sink, rx) = raw_channel();
        let hook = self.adapter.install(sink)?;

        inner.generation += 1;
        let generation = inner.generation;
        let shared = Arc::clone(&self.inner);
        let call_finished = Arc::clone(&self.call_finished);
        let filter = RepeatFilter::new(self.config.repeat_policy);

        let spawned = thread::Builder::new()
            .name("keytap-dispatch".to_string())
            .spawn(move || run_dispatcher(rx, shared, call_finished, generation, filter));

        match spawned {
            Ok(dispatcher) => Ok(Session { hook, dispatcher }),
            Err(e) => {
                self.adapter.uninstall(hook);
                Err(HookInstallError::ThreadSpawn(e.to_string()))
            }
        }
    }
}

impl<B: HookBackend> Drop for CaptureEngine<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the per-session dispatcher thread.
fn run_dispatcher(
    rx: Receiver<RawKeyEvent>,
    inner: Arc<Mutex<EngineInner>>,
    call_finished: Arc<Condvar>,
    generation: u64,
    mut filter: RepeatFilter,
) {
    debug!(generation, "dispatcher started");

    while let Ok(raw) = rx.recv() {
        let listeners = {
            let inner = lock(&inner);
            if inner.generation != generation {
                break;
            }
            inner.listeners.clone()
        };

        let Some(is_repeat) = filter.admit(&raw) else {
            trace!(code = ?raw.code, "auto-repeat suppressed");
            continue;
        };
        let event = KeyEvent::new(KeyTranslator::translate(raw.code), raw.is_key_up, is_repeat);
        debug!(
            key = event.key,
            key_code = event.key_code,
            is_key_up = event.is_key_up,
            "key event"
        );

        for (handle, listener) in &listeners {
            {
                let mut guard = lock(&inner);
                if guard.generation != generation {
                    debug!(generation, "session stopped mid-dispatch");
                    return;
                }
                guard.in_flight.insert(generation);
            }
            invoke_isolated(*handle, listener, &event);
            lock(&inner).in_flight.remove(&generation);
            call_finished.notify_all();
        }
    }

    debug!(generation, "dispatcher exited");
}

fn lock(inner: &Mutex<EngineInner>) -> MutexGuard<'_, EngineInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::mock::MockBackend;
    use keytap_core::RawKeyCode;
    use std::sync::mpsc;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn recording_listener() -> (impl Fn(&KeyEvent) + Send + Sync + 'static, mpsc::Receiver<KeyEvent>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let listener = move |event: &KeyEvent| {
            let _ = tx.lock().unwrap().send(*event);
        };
        (listener, rx)
    }

    #[test]
    fn test_new_engine_is_idle() {
        let engine = CaptureEngine::new(MockBackend::new(), EngineConfig::default());
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.listener_count(), 0);
    }

    #[test]
    fn test_start_installs_hook_and_delivers_translated_event() {
        // Arrange
        let backend = MockBackend::new();
        let engine = CaptureEngine::new(backend.clone(), EngineConfig::default());
        let (listener, rx) = recording_listener();

        // Act
        engine.start(listener).expect("start");
        backend.inject(RawKeyCode::Windows(0x1B), false);

        // Assert
        let event = rx.recv_timeout(TIMEOUT).expect("event delivered");
        assert_eq!(event.as_tuple(), ("Escape", false, 27));
        assert_eq!(engine.state(), EngineState::Running);
        assert_eq!(backend.open_count(), 1);
    }

    #[test]
    fn test_listener_handles_are_distinct() {
        let engine = CaptureEngine::new(MockBackend::new(), EngineConfig::default());
        let first = engine.start(|_: &KeyEvent| {}).unwrap();
        let second = engine.start(|_: &KeyEvent| {}).unwrap();
        assert_ne!(first, second);
        assert_eq!(engine.listener_count(), 2);
    }

    #[test]
    fn test_failed_start_stays_idle() {
        // Arrange
        let backend = MockBackend::new();
        backend.set_install_error(Some(HookInstallError::PermissionDenied("denied".into())));
        let engine = CaptureEngine::new(backend.clone(), EngineConfig::default());

        // Act
        let result = engine.start(|_: &KeyEvent| {});

        // Assert
        assert_eq!(result, Err(HookInstallError::PermissionDenied("denied".into())));
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.listener_count(), 0);
    }

    #[test]
    fn test_stop_releases_hook_once_and_clears_listeners() {
        // Arrange
        let backend = MockBackend::new();
        let engine = CaptureEngine::new(backend.clone(), EngineConfig::default());
        engine.start(|_: &KeyEvent| {}).unwrap();

        // Act
        engine.stop();
        engine.stop();

        // Assert
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.listener_count(), 0);
        assert_eq!(backend.release_count(), 1);
        assert!(!backend.is_open());
    }

    #[test]
    fn test_drop_releases_hook() {
        let backend = MockBackend::new();
        {
            let engine = CaptureEngine::new(backend.clone(), EngineConfig::default());
            engine.start(|_: &KeyEvent| {}).unwrap();
        }
        assert_eq!(backend.release_count(), 1);
    }

    #[test]
    fn test_engine_config_parses_from_toml() {
        let config: EngineConfig =
            toml::from_str("repeat_policy = \"forward\"\ndevice = \"/dev/input/event3\"").unwrap();
        assert_eq!(config.repeat_policy, RepeatPolicy::Forward);
        assert_eq!(config.device, Some(PathBuf::from("/dev/input/event3")));
    }
}
