//! Windows low-level keyboard hook.
//!
//! Installs `WH_KEYBOARD_LL` on a dedicated thread that owns a Win32 message
//! loop. The hook procedure runs on that thread and must return quickly, so
//! it only copies `vkCode` into the sink and chains with `CallNextHookEx`.
//!
//! # Safety
//!
//! This module uses `unsafe` code exclusively for Windows API FFI calls.
//! All `unsafe` blocks are annotated with `// SAFETY:` comments.

#![cfg(target_os = "windows")]

use std::sync::mpsc::{self, SyncSender};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use keytap_core::RawKeyCode;
use tracing::{debug, warn};
use windows::Win32::Foundation::{LPARAM, LRESULT, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::WindowsAndMessaging::{
    CallNextHookEx, DispatchMessageW, GetMessageW, PeekMessageW, PostThreadMessageW,
    SetWindowsHookExW, UnhookWindowsHookEx, HC_ACTION, KBDLLHOOKSTRUCT, MSG, PM_NOREMOVE,
    WH_KEYBOARD_LL, WM_KEYDOWN, WM_KEYUP, WM_QUIT, WM_SYSKEYDOWN, WM_SYSKEYUP,
};

use super::{ActiveHook, HookBackend, HookInstallError, RawEventSink, RawKeyEvent};

/// Sink read by the hook procedure. A hook procedure has no user data
/// pointer, so only one hook per process can own it.
static HOOK_SINK: Mutex<Option<RawEventSink>> = Mutex::new(None);

fn hook_sink() -> MutexGuard<'static, Option<RawEventSink>> {
    HOOK_SINK.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `WH_KEYBOARD_LL` backend.
#[derive(Debug, Default)]
pub struct WindowsHook;

impl WindowsHook {
    pub fn new() -> Self {
        Self
    }
}

impl HookBackend for WindowsHook {
    fn open(&self, sink: RawEventSink) -> Result<Box<dyn ActiveHook>, HookInstallError> {
        {
            let mut slot = hook_sink();
            if slot.is_some() {
                return Err(HookInstallError::ChannelOccupied(
                    "another WH_KEYBOARD_LL hook in this process owns the event sink".to_string(),
                ));
            }
            *slot = Some(sink);
        }

        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let thread = match thread::Builder::new()
            .name("keytap-hook".to_string())
            .spawn(move || run_hook_message_loop(ready_tx))
        {
            Ok(thread) => thread,
            Err(e) => {
                hook_sink().take();
                return Err(HookInstallError::ThreadSpawn(e.to_string()));
            }
        };

        let outcome = ready_rx.recv().unwrap_or_else(|_| {
            Err(HookInstallError::ThreadSpawn(
                "hook thread exited before reporting".to_string(),
            ))
        });
        match outcome {
            Ok(thread_id) => {
                debug!(thread_id, "WH_KEYBOARD_LL installed");
                Ok(Box::new(InstalledWindowsHook { thread_id, thread }))
            }
            Err(e) => {
                let _ = thread.join();
                hook_sink().take();
                Err(e)
            }
        }
    }
}

struct InstalledWindowsHook {
    thread_id: u32,
    thread: JoinHandle<()>,
}

impl ActiveHook for InstalledWindowsHook {
    fn release(self: Box<Self>) {
        let InstalledWindowsHook { thread_id, thread } = *self;
        hook_sink().take();

        // SAFETY: `thread_id` belongs to the hook thread, whose message queue
        // was created with PeekMessageW before it reported ready.
        match unsafe { PostThreadMessageW(thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) } {
            Ok(()) => {
                if thread.join().is_err() {
                    warn!("keyboard hook thread panicked");
                }
            }
            Err(e) => warn!("could not stop keyboard hook thread {thread_id}: {e}"),
        }
    }
}

/// Entry point for the dedicated hook thread.
fn run_hook_message_loop(ready: SyncSender<Result<u32, HookInstallError>>) {
    let mut msg = MSG::default();

    // SAFETY: Forces creation of this thread's message queue so that
    // PostThreadMessageW(WM_QUIT) cannot race the first GetMessageW.
    unsafe {
        let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
    }

    // SAFETY: LL hooks require a message loop on the installing thread, which
    // this function runs below. A null module handle is valid for LL hooks.
    let hook = match unsafe { SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), None, 0) } {
        Ok(hook) => hook,
        Err(e) => {
            let _ = ready.send(Err(HookInstallError::PermissionDenied(e.to_string())));
            return;
        }
    };

    // SAFETY: No preconditions.
    let thread_id = unsafe { GetCurrentThreadId() };
    if ready.send(Ok(thread_id)).is_err() {
        // SAFETY: `hook` was returned by SetWindowsHookExW on this thread.
        unsafe {
            let _ = UnhookWindowsHookEx(hook);
        }
        return;
    }

    // SAFETY: Standard Win32 GetMessage/DispatchMessage loop pattern; exits on WM_QUIT.
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            DispatchMessageW(&msg);
        }
        let _ = UnhookWindowsHookEx(hook);
    }
}

fn transition(w_param: WPARAM) -> Option<bool> {
    match w_param.0 as u32 {
        WM_KEYDOWN | WM_SYSKEYDOWN => Some(false),
        WM_KEYUP | WM_SYSKEYUP => Some(true),
        _ => None,
    }
}

/// Low-level keyboard hook callback.
///
/// # Safety
///
/// Called by Windows on the hook thread. It must return quickly (< ~300ms)
/// or the OS silently removes the hook.
unsafe extern "system" fn keyboard_hook_proc(
    n_code: i32,
    w_param: WPARAM,
    l_param: LPARAM,
) -> LRESULT {
    if n_code == HC_ACTION as i32 {
        if let Some(is_key_up) = transition(w_param) {
            // SAFETY: l_param points to a KBDLLHOOKSTRUCT when n_code == HC_ACTION.
            let kbs = &*(l_param.0 as *const KBDLLHOOKSTRUCT);
            if let Some(sink) = hook_sink().as_ref() {
                sink.emit(RawKeyEvent {
                    code: RawKeyCode::Windows(kbs.vkCode),
                    is_key_up,
                    is_repeat: false,
                });
            }
        }
    }

    // SAFETY: Always forward to the next hook; this hook only observes.
    CallNextHookEx(None, n_code, w_param, l_param)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_classifies_key_messages() {
        assert_eq!(transition(WPARAM(WM_KEYDOWN as usize)), Some(false));
        assert_eq!(transition(WPARAM(WM_SYSKEYDOWN as usize)), Some(false));
        assert_eq!(transition(WPARAM(WM_KEYUP as usize)), Some(true));
        assert_eq!(transition(WPARAM(WM_SYSKEYUP as usize)), Some(true));
        assert_eq!(transition(WPARAM(0x0200)), None); // WM_MOUSEMOVE
    }
}
