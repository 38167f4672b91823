//! Per-event dispatch helpers used by the capture engine's dispatcher thread.
//!
//! - [`RepeatFilter`] tracks which keys are held and decides whether an
//!   auto-repeat key-down reaches listeners.
//! - [`invoke_isolated`] calls one listener and contains a panic so that the
//!   remaining listeners (and later events) still run.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use keytap_core::{KeyEvent, RawKeyCode};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::capture_engine::ListenerHandle;
use crate::infrastructure::input_capture::RawKeyEvent;

/// A registered callback.
pub type Listener = Arc<dyn Fn(&KeyEvent) + Send + Sync>;

/// What happens to key-downs for a key that is already held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPolicy {
    /// Drop them; listeners see one down and one up per physical press.
    #[default]
    Suppress,
    /// Deliver them as key-downs with `is_repeat = true`.
    Forward,
}

/// Held-key tracker for one engine session.
#[derive(Debug)]
pub struct RepeatFilter {
    policy: RepeatPolicy,
    held: HashSet<RawKeyCode>,
}

impl RepeatFilter {
    pub fn new(policy: RepeatPolicy) -> Self {
        Self {
            policy,
            held: HashSet::new(),
        }
    }

    /// Decides whether `event` is delivered.
    ///
    /// Returns `Some(is_repeat)` to deliver, `None` to drop. Key-ups are
    /// always delivered.
    ///
    /// Backends that flag repeats themselves are trusted, so a lost key-up
    /// never swallows the next real press. For the others a down for a key
    /// that is already held counts as a repeat.
    pub fn admit(&mut self, event: &RawKeyEvent) -> Option<bool> {
        if event.is_key_up {
            self.held.remove(&event.code);
            return Some(false);
        }

        let newly_held = self.held.insert(event.code);
        let is_repeat = event.is_repeat || (!newly_held && !flags_repeats(event.code));
        if !is_repeat {
            return Some(false);
        }
        match self.policy {
            RepeatPolicy::Forward => Some(true),
            RepeatPolicy::Suppress => None,
        }
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }
}

/// `true` when the platform marks auto-repeat on the event itself: evdev
/// value 2, or `kCGKeyboardEventAutorepeat`. `WH_KEYBOARD_LL` does not.
fn flags_repeats(code: RawKeyCode) -> bool {
    match code {
        RawKeyCode::Linux(_) | RawKeyCode::MacOs(_) => true,
        RawKeyCode::Windows(_) => false,
    }
}

/// Invokes `listener`, logging instead of unwinding if it panics.
///
/// Returns `false` if the listener panicked.
pub fn invoke_isolated(handle: ListenerHandle, listener: &Listener, event: &KeyEvent) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
        Ok(()) => true,
        Err(payload) => {
            error!(
                listener = handle.id(),
                key = event.key,
                "listener panicked: {}",
                panic_message(payload.as_ref())
            );
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "<non-string panic payload>"
    }
}
