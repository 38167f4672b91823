//! # keytap-core
//!
//! Value types and key code translation tables for keytap.
//!
//! This crate has no OS dependencies. It is shared by the capture engine and
//! by anything that wants to name platform key codes without installing a hook.
//!
//! - **`keymap`** – per-platform tables (Windows VK, Linux evdev, macOS
//!   `CGKeyCode`) onto USB HID Usage IDs, and the versioned naming table that
//!   turns a HID position into `(key, keyCode, code)`.
//! - **`event`** – [`KeyEvent`], the value listeners receive.

pub mod event;
pub mod keymap;

pub use event::KeyEvent;
pub use keymap::hid::HidKeyCode;
pub use keymap::{
    KeyIdentity, KeyTranslator, RawKeyCode, KEY_TABLE_VERSION, UNIDENTIFIED, UNIDENTIFIED_KEY_CODE,
};
