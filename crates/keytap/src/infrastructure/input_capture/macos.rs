//! macOS keyboard capture via `CGEventTap`.
//!
//! A listen-only session tap for `KeyDown`, `KeyUp` and `FlagsChanged`, run
//! on a dedicated thread with its own `CFRunLoop`. Modifier keys only produce
//! `FlagsChanged`; whether the change is a press or a release is read from the
//! device-dependent (left/right) flag bits.
//!
//! Creating the tap fails unless the process has Accessibility or Input
//! Monitoring permission.

#![cfg(target_os = "macos")]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventTapProxy, CGEventType, EventField,
};
use keytap_core::keymap::macos_cg::modifier;
use keytap_core::RawKeyCode;
use tracing::{debug, info, warn};

use super::{ActiveHook, HookBackend, HookInstallError, RawEventSink, RawKeyEvent};

/// How long one run-loop slice lasts before the stop flag is checked again.
const RUN_LOOP_SLICE: Duration = Duration::from_millis(100);

// Device-dependent modifier bits (IOKit `NX_DEVICE*KEYMASK`).
const NX_DEVICELCTLKEYMASK: u64 = 0x0000_0001;
const NX_DEVICELSHIFTKEYMASK: u64 = 0x0000_0002;
const NX_DEVICERSHIFTKEYMASK: u64 = 0x0000_0004;
const NX_DEVICELCMDKEYMASK: u64 = 0x0000_0008;
const NX_DEVICERCMDKEYMASK: u64 = 0x0000_0010;
const NX_DEVICELALTKEYMASK: u64 = 0x0000_0020;
const NX_DEVICERALTKEYMASK: u64 = 0x0000_0040;
const NX_DEVICERCTLKEYMASK: u64 = 0x0000_2000;
/// `kCGEventFlagMaskAlphaShift`: Caps Lock state, not key state.
const ALPHA_SHIFT_MASK: u64 = 0x0001_0000;

/// `CGEventTap` backend.
#[derive(Debug, Default)]
pub struct EventTapHook;

impl EventTapHook {
    pub fn new() -> Self {
        Self
    }
}

impl HookBackend for EventTapHook {
    fn open(&self, sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError> {
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let thread_running = Arc::clone(&running);
        let thread = thread::Builder::new()
            .name("keytap-event-tap".to_string())
            .spawn(move || run_event_tap(sink, thread_running, ready_tx))
            .map_err(|e| HookInstallError::ThreadSpawn(e.to_string()))?;

        let outcome = ready_rx.recv().unwrap_or_else(|_| {
            Err(HookInstallError::ThreadSpawn(
                "event tap thread exited before reporting".to_string(),
            ))
        });
        match outcome {
            Ok(()) => Ok(Box::new(InstalledEventTap { running, thread })),
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }
}

struct InstalledEventTap {
    running: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl ActiveHook for InstalledEventTap {
    fn release(self: Box<Self>) {
        self.running.store(false, Ordering::SeqCst);
        // Returns within one run-loop slice; the tap and its sink drop with the thread.
        if self.thread.join().is_err() {
            warn!("event tap thread panicked");
        }
    }
}

fn run_event_tap(
    sink: RawEventSink,
    running: Arc<AtomicBool>,
    ready: SyncSender<Result<(), HookInstallError>>,
) {
    let disabled = Arc::new(AtomicBool::new(false));
    let callback_disabled = Arc::clone(&disabled);

    // Runs on this thread inside CFRunLoop; must stay fast.
    let callback = move |_proxy: CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        match event_type {
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                callback_disabled.store(true, Ordering::SeqCst);
            }
            _ => {
                if let Some(raw) = to_raw_event(event_type, event) {
                    sink.emit(raw);
                }
            }
        }
        None
    };

    let tap = match CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown, CGEventType::KeyUp, CGEventType::FlagsChanged],
        callback,
    ) {
        Ok(tap) => tap,
        Err(()) => {
            let _ = ready.send(Err(HookInstallError::PermissionDenied(
                "CGEventTapCreate failed; grant Accessibility or Input Monitoring".to_string(),
            )));
            return;
        }
    };

    let source = match tap.mach_port.create_runloop_source(0) {
        Ok(source) => source,
        Err(()) => {
            let _ = ready.send(Err(HookInstallError::PermissionDenied(
                "could not create run loop source for event tap".to_string(),
            )));
            return;
        }
    };

    let run_loop = CFRunLoop::get_current();
    // SAFETY: kCFRunLoopCommonModes is an immutable CoreFoundation constant.
    unsafe {
        run_loop.add_source(&source, kCFRunLoopCommonModes);
    }
    tap.enable();

    if ready.send(Ok(())).is_err() {
        return;
    }
    info!("event tap enabled");

    while running.load(Ordering::SeqCst) {
        // SAFETY: kCFRunLoopDefaultMode is an immutable CoreFoundation constant.
        unsafe {
            CFRunLoop::run_in_mode(kCFRunLoopDefaultMode, RUN_LOOP_SLICE, true);
        }
        if disabled.swap(false, Ordering::SeqCst) {
            warn!("event tap disabled by the system, re-enabling");
            tap.enable();
        }
    }

    // SAFETY: same constant the source was added with.
    unsafe {
        run_loop.remove_source(&source, kCFRunLoopCommonModes);
    }
    debug!("event tap thread exiting");
}

fn to_raw_event(event_type: CGEventType, event: &CGEvent) -> Option<RawKeyEvent> {
    let keycode = event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
    let code = u32::try_from(keycode).ok()?;

    match event_type {
        CGEventType::KeyDown => Some(RawKeyEvent {
            code: RawKeyCode::MacOs(code),
            is_key_up: false,
            is_repeat: event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT) != 0,
        }),
        CGEventType::KeyUp => Some(RawKeyEvent::up(RawKeyCode::MacOs(code))),
        CGEventType::FlagsChanged => {
            let held = modifier_held(code, event.get_flags().bits())?;
            Some(RawKeyEvent {
                code: RawKeyCode::MacOs(code),
                is_key_up: !held,
                is_repeat: false,
            })
        }
        _ => None,
    }
}

/// Whether the modifier `code` is down according to `flags`.
///
/// `None` for keycodes that are not modifiers (including `kVK_Function`,
/// which has no published name).
fn modifier_held(code: u32, flags: u64) -> Option<bool> {
    let code = u16::try_from(code).ok()?;
    let mask = match code {
        modifier::SHIFT => NX_DEVICELSHIFTKEYMASK,
        modifier::RIGHT_SHIFT => NX_DEVICERSHIFTKEYMASK,
        modifier::CONTROL => NX_DEVICELCTLKEYMASK,
        modifier::RIGHT_CONTROL => NX_DEVICERCTLKEYMASK,
        modifier::OPTION => NX_DEVICELALTKEYMASK,
        modifier::RIGHT_OPTION => NX_DEVICERALTKEYMASK,
        modifier::COMMAND => NX_DEVICELCMDKEYMASK,
        modifier::RIGHT_COMMAND => NX_DEVICERCMDKEYMASK,
        modifier::CAPS_LOCK => ALPHA_SHIFT_MASK,
        _ => return None,
    };
    Some(flags & mask != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_left_and_right_shift_are_tracked_separately() {
        let only_left = NX_DEVICELSHIFTKEYMASK;
        assert_eq!(modifier_held(modifier::SHIFT.into(), only_left), Some(true));
        assert_eq!(modifier_held(modifier::RIGHT_SHIFT.into(), only_left), Some(false));
    }

    #[test]
    fn test_release_clears_device_bit() {
        assert_eq!(modifier_held(modifier::RIGHT_COMMAND.into(), 0), Some(false));
        assert_eq!(
            modifier_held(modifier::RIGHT_COMMAND.into(), NX_DEVICERCMDKEYMASK),
            Some(true)
        );
    }

    #[test]
    fn test_non_modifiers_and_fn_are_ignored() {
        assert_eq!(modifier_held(0x00, u64::MAX), None); // kVK_ANSI_A
        assert_eq!(modifier_held(modifier::FUNCTION.into(), u64::MAX), None);
        assert_eq!(modifier_held(u32::MAX, u64::MAX), None);
    }
}
