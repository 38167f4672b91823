//! The value delivered to listeners.

use serde::Serialize;

use crate::keymap::{KeyIdentity, KeyTranslator, RawKeyCode};

/// One physical key transition, translated.
///
/// Serializes as `{"key":"a","isKeyUp":false,"keyCode":65,"code":"KeyA","isRepeat":false}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEvent {
    pub key: &'static str,
    pub is_key_up: bool,
    pub key_code: i32,
    pub code: &'static str,
    /// Only `true` for auto-repeat key-downs forwarded under the `forward` policy.
    pub is_repeat: bool,
}

impl KeyEvent {
    pub fn new(identity: KeyIdentity, is_key_up: bool, is_repeat: bool) -> Self {
        Self {
            key: identity.key,
            is_key_up,
            key_code: identity.key_code,
            code: identity.code,
            is_repeat,
        }
    }

    /// Translates `raw` and builds the event in one step.
    pub fn from_raw(raw: RawKeyCode, is_key_up: bool, is_repeat: bool) -> Self {
        Self::new(KeyTranslator::translate(raw), is_key_up, is_repeat)
    }

    /// The `(key, isKeyUp, keyCode)` triple of the public callback contract.
    pub fn as_tuple(&self) -> (&'static str, bool, i32) {
        (self.key, self.is_key_up, self.key_code)
    }
}
