//! Async hand-off: turns engine callbacks into a `tokio` channel.
//!
//! The dispatcher thread is a plain OS thread, so async consumers register a
//! listener that forwards into an unbounded `tokio::sync::mpsc` channel and
//! drain it on their own runtime. Sending never blocks the dispatcher.

use keytap_core::KeyEvent;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::trace;

use super::capture_engine::{CaptureEngine, ListenerHandle};
use crate::infrastructure::input_capture::{HookBackend, HookInstallError};

/// Returns a listener that forwards every event into the returned receiver.
///
/// Events are dropped once the receiver has been closed.
pub fn channel_listener() -> (
    impl Fn(&KeyEvent) + Send + Sync + 'static,
    UnboundedReceiver<KeyEvent>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let listener = move |event: &KeyEvent| {
        if tx.send(*event).is_err() {
            trace!("event receiver closed, dropping event");
        }
    };
    (listener, rx)
}

impl<B: HookBackend> CaptureEngine<B> {
    /// Starts (or joins) capture with a channel-backed listener.
    ///
    /// The receiver yields `None` after [`CaptureEngine::stop`], once the
    /// listener has been dropped.
    ///
    /// # Errors
    ///
    /// Same as [`CaptureEngine::start`].
    pub fn event_channel(
        &self,
    ) -> Result<(ListenerHandle, UnboundedReceiver<KeyEvent>), HookInstallError> {
        let (listener, rx) = channel_listener();
        let handle = self.start(listener)?;
        Ok((handle, rx))
    }
}
