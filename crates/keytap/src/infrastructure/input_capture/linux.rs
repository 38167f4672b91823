//! Linux evdev keyboard capture.
//!
//! Reads `EV_KEY` events straight from `/dev/input/event*`, so it works the
//! same on X11, Wayland and the console.
//!
//! One `keytap-evdev` thread runs a current-thread `tokio` runtime with one
//! reader task per keyboard device. Each device is switched to non-blocking
//! mode by [`Device::into_event_stream`], so a reader waits on the device and
//! the stop signal at the same time. `release` sends the signal and joins the
//! thread, which closes every device file before it returns.
//!
//! ## Permissions
//!
//! The process must be able to open the event devices: run as a user in the
//! `input` group (or as root).

#![cfg(target_os = "linux")]

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self as std_mpsc, SyncSender};
use std::thread::{self, JoinHandle};

use evdev::{Device, EventStream, EventType, InputEvent, Key};
use keytap_core::RawKeyCode;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::{ActiveHook, HookBackend, HookInstallError, RawEventSink, RawKeyEvent};

const INPUT_DIR: &str = "/dev/input";

/// evdev backend.
#[derive(Debug, Default)]
pub struct EvdevHook {
    /// Read only this device instead of discovering keyboards.
    device: Option<PathBuf>,
}

impl EvdevHook {
    pub fn new(device: Option<PathBuf>) -> Self {
        Self { device }
    }

    fn open_devices(&self) -> Result<Vec<(PathBuf, Device)>, HookInstallError> {
        match &self.device {
            Some(path) => open_configured(path).map(|device| vec![(path.clone(), device)]),
            None => discover_keyboards(),
        }
    }
}

impl HookBackend for EvdevHook {
    fn open(&self, sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError> {
        let devices = self.open_devices()?;
        let readers = start_readers(move || into_streams(devices), sink)?;
        Ok(Box::new(readers))
    }
}

/// An async source of raw input events for one device.
trait KeySource: Send + 'static {
    fn next_event(&mut self) -> impl Future<Output = io::Result<InputEvent>> + Send + '_;
}

impl KeySource for EventStream {
    fn next_event(&mut self) -> impl Future<Output = io::Result<InputEvent>> + Send + '_ {
        EventStream::next_event(self)
    }
}

/// Must run inside the reader runtime: the streams register with its reactor.
fn into_streams(devices: Vec<(PathBuf, Device)>) -> Vec<(PathBuf, EventStream)> {
    devices
        .into_iter()
        .filter_map(|(path, device)| match device.into_event_stream() {
            Ok(stream) => Some((path, stream)),
            Err(e) => {
                warn!(path = %path.display(), "cannot watch input device: {e}");
                None
            }
        })
        .collect()
}

struct EvdevReaders {
    stop: watch::Sender<bool>,
    thread: JoinHandle<()>,
}

impl ActiveHook for EvdevReaders {
    fn release(self: Box<Self>) {
        // Sending fails only if every reader is already gone.
        let _ = self.stop.send(true);
        if self.thread.join().is_err() {
            warn!("evdev reader thread panicked");
        }
    }
}

/// Spawns the reader thread and waits until its sources are open.
fn start_readers<S, F>(open_sources: F, sink: RawEventSink) -> Result<EvdevReaders, HookInstallError>
where
    S: KeySource,
    F: FnOnce() -> Vec<(PathBuf, S)> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

    let thread = thread::Builder::new()
        .name("keytap-evdev".to_string())
        .spawn(move || run_readers(open_sources, sink, stop_rx, ready_tx))
        .map_err(|e| HookInstallError::ThreadSpawn(e.to_string()))?;

    let outcome = ready_rx.recv().unwrap_or_else(|_| {
        Err(HookInstallError::ThreadSpawn(
            "evdev reader thread exited before reporting".to_string(),
        ))
    });
    match outcome {
        Ok(readers) => {
            info!(readers, "evdev keyboard readers started");
            Ok(EvdevReaders { stop: stop_tx, thread })
        }
        Err(e) => {
            let _ = thread.join();
            Err(e)
        }
    }
}

fn run_readers<S, F>(
    open_sources: F,
    sink: RawEventSink,
    stop: watch::Receiver<bool>,
    ready: SyncSender<Result<usize, HookInstallError>>,
) where
    S: KeySource,
    F: FnOnce() -> Vec<(PathBuf, S)>,
{
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_io().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            let _ = ready.send(Err(HookInstallError::ThreadSpawn(format!(
                "evdev reader runtime: {e}"
            ))));
            return;
        }
    };

    runtime.block_on(async move {
        let sources = open_sources();
        if sources.is_empty() {
            let _ = ready.send(Err(HookInstallError::NoKeyboardDevice));
            return;
        }
        if ready.send(Ok(sources.len())).is_err() {
            return;
        }

        let mut readers = JoinSet::new();
        for (path, source) in sources {
            readers.spawn(read_device(path, source, sink.clone(), stop.clone()));
        }
        drop(sink);
        while readers.join_next().await.is_some() {}
    });
    debug!("evdev reader thread exiting");
}

async fn read_device<S: KeySource>(
    path: PathBuf,
    mut source: S,
    sink: RawEventSink,
    mut stop: watch::Receiver<bool>,
) {
    debug!(path = %path.display(), "evdev reader running");

    loop {
        let event = tokio::select! {
            biased;
            _ = stop.changed() => break,
            event = source.next_event() => event,
        };
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(path = %path.display(), "evdev read failed, reader exiting: {e}");
                break;
            }
        };

        if event.event_type() != EventType::KEY {
            continue;
        }
        let Some((is_key_up, is_repeat)) = classify_value(event.value()) else {
            continue;
        };
        let raw = RawKeyEvent {
            code: RawKeyCode::Linux(u32::from(event.code())),
            is_key_up,
            is_repeat,
        };
        if !sink.emit(raw) {
            break;
        }
    }

    debug!(path = %path.display(), "evdev reader stopped");
}

/// Maps an `EV_KEY` value to `(is_key_up, is_repeat)`.
fn classify_value(value: i32) -> Option<(bool, bool)> {
    match value {
        0 => Some((true, false)),
        1 => Some((false, false)),
        2 => Some((false, true)),
        _ => None,
    }
}

fn is_keyboard(device: &Device) -> bool {
    device.supported_keys().is_some_and(|keys| {
        keys.contains(Key::KEY_ENTER) && keys.contains(Key::KEY_A) && keys.contains(Key::KEY_SPACE)
    })
}

fn open_configured(path: &Path) -> Result<Device, HookInstallError> {
    let device = Device::open(path).map_err(|e| open_error(path, e))?;
    if is_keyboard(&device) {
        Ok(device)
    } else {
        warn!(path = %path.display(), "configured device does not report keyboard keys");
        Err(HookInstallError::NoKeyboardDevice)
    }
}

fn discover_keyboards() -> Result<Vec<(PathBuf, Device)>, HookInstallError> {
    let entries = std::fs::read_dir(INPUT_DIR).map_err(|e| open_error(Path::new(INPUT_DIR), e))?;

    let mut keyboards = Vec::new();
    let mut denied = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if !file_name(&path).starts_with("event") {
            continue;
        }
        match Device::open(&path) {
            Ok(device) if is_keyboard(&device) => keyboards.push((path, device)),
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => denied.push(path),
            Err(e) => debug!(path = %path.display(), "skipping input device: {e}"),
        }
    }

    if !keyboards.is_empty() {
        if !denied.is_empty() {
            warn!(count = denied.len(), "some input devices were not readable");
        }
        return Ok(keyboards);
    }
    if let Some(first) = denied.first() {
        return Err(permission_denied(first));
    }
    Err(HookInstallError::NoKeyboardDevice)
}

fn open_error(path: &Path, e: io::Error) -> HookInstallError {
    match e.kind() {
        io::ErrorKind::PermissionDenied => permission_denied(path),
        _ => {
            debug!(path = %path.display(), "cannot open input device: {e}");
            HookInstallError::NoKeyboardDevice
        }
    }
}

fn permission_denied(path: &Path) -> HookInstallError {
    HookInstallError::PermissionDenied(format!(
        "cannot read {} (add the user to the `input` group)",
        path.display()
    ))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::input_capture::raw_channel;
    use std::collections::VecDeque;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(2);
    const KEY_A: u16 = 30;

    /// Yields its events, then stays silent forever like an idle device.
    struct Scripted(VecDeque<InputEvent>);

    impl Scripted {
        fn silent() -> Self {
            Self(VecDeque::new())
        }
    }

    impl KeySource for Scripted {
        fn next_event(&mut self) -> impl Future<Output = io::Result<InputEvent>> + Send + '_ {
            let next = self.0.pop_front();
            async move {
                match next {
                    Some(event) => Ok(event),
                    None => std::future::pending().await,
                }
            }
        }
    }

    fn key(code: u16, value: i32) -> InputEvent {
        InputEvent::new(EventType::KEY, code, value)
    }

    /// Releases on another thread so a hung join fails the test instead of blocking it.
    fn release_within_timeout(readers: EvdevReaders) -> bool {
        let (done_tx, done_rx) = std_mpsc::channel();
        thread::spawn(move || {
            Box::new(readers).release();
            let _ = done_tx.send(());
        });
        done_rx.recv_timeout(TIMEOUT).is_ok()
    }

    #[test]
    fn test_classify_value_maps_ev_key_values() {
        assert_eq!(classify_value(0), Some((true, false)));
        assert_eq!(classify_value(1), Some((false, false)));
        assert_eq!(classify_value(2), Some((false, true)));
        assert_eq!(classify_value(3), None);
        assert_eq!(classify_value(-1), None);
    }

    #[test]
    fn test_readers_forward_key_events_only() {
        // Arrange
        let (sink, rx) = raw_channel();
        let script = Scripted(VecDeque::from([
            key(KEY_A, 1),
            InputEvent::new(EventType::SYNCHRONIZATION, 0, 0),
            key(KEY_A, 2),
            key(KEY_A, 0),
        ]));

        // Act
        let readers =
            start_readers(move || vec![(PathBuf::from("event0"), script)], sink).expect("start");
        let seen: Vec<_> = (0..3).map(|_| rx.recv_timeout(TIMEOUT).expect("event")).collect();

        // Assert
        let code = RawKeyCode::Linux(u32::from(KEY_A));
        assert_eq!(
            seen,
            vec![RawKeyEvent::down(code), RawKeyEvent::repeat(code), RawKeyEvent::up(code)]
        );
        assert!(release_within_timeout(readers));
    }

    #[test]
    fn test_release_stops_readers_on_silent_devices() {
        // Arrange
        let (sink, rx) = raw_channel();
        let silent_devices = || {
            vec![
                (PathBuf::from("event1"), Scripted::silent()),
                (PathBuf::from("event2"), Scripted::silent()),
            ]
        };
        let readers = start_readers(silent_devices, sink).expect("start");

        // Act
        let released = release_within_timeout(readers);

        // Assert: the thread is joined and every sink clone is gone
        assert!(released, "release must not wait for device input");
        assert!(rx.recv_timeout(TIMEOUT).is_err());
    }

    #[test]
    fn test_no_sources_fails_without_leaving_a_thread() {
        let (sink, rx) = raw_channel();

        let result = start_readers(Vec::<(PathBuf, Scripted)>::new, sink);

        assert!(matches!(result, Err(HookInstallError::NoKeyboardDevice)));
        assert!(rx.recv_timeout(TIMEOUT).is_err(), "sink dropped with the thread");
    }

    #[test]
    fn test_open_with_missing_configured_device_fails_cleanly() {
        let backend = EvdevHook::new(Some(PathBuf::from("/nonexistent/keytap/event99")));

        let result = backend.open(raw_channel().0);

        assert_eq!(result.err(), Some(HookInstallError::NoKeyboardDevice));
    }

    #[test]
    fn test_permission_error_names_the_device() {
        let err = open_error(
            Path::new("/dev/input/event7"),
            io::Error::from(io::ErrorKind::PermissionDenied),
        );
        match err {
            HookInstallError::PermissionDenied(msg) => assert!(msg.contains("event7")),
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_configured_device_is_no_keyboard() {
        let result = open_configured(Path::new("/nonexistent/keytap/event99"));
        assert_eq!(result.err(), Some(HookInstallError::NoKeyboardDevice));
    }

    #[test]
    fn test_file_name_of_event_node() {
        assert_eq!(file_name(Path::new("/dev/input/event3")), "event3");
        assert_eq!(file_name(Path::new("/")), "");
    }
}
