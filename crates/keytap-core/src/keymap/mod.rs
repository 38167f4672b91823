//! Key code translation tables.
//!
//! Every platform code is first placed on the USB HID Keyboard page
//! ([`HidKeyCode`], a physical key position) and then named through the
//! versioned table in [`dom`]. Both stages are total: anything a table cannot
//! place ends up as `"Unidentified"` / `-1`, never as an error.

pub mod dom;
pub mod hid;
pub mod linux_evdev;
pub mod macos_cg;
pub mod windows_vk;

use serde::{Deserialize, Serialize};

pub use dom::{KEY_TABLE_VERSION, UNIDENTIFIED, UNIDENTIFIED_KEY_CODE};
pub use hid::HidKeyCode;

/// A key code as the operating system delivered it.
///
/// The meaning of the number depends on the variant; the same physical key has
/// a different value on each platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "platform", content = "code", rename_all = "lowercase")]
pub enum RawKeyCode {
    /// Windows Virtual-Key code (`KBDLLHOOKSTRUCT::vkCode`).
    Windows(u32),
    /// Linux evdev `KEY_*` code (`input_event::code`).
    Linux(u32),
    /// macOS `CGKeyCode` (`kCGKeyboardEventKeycode`).
    MacOs(u32),
}

/// The published identity of a key: what listeners see, minus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyIdentity {
    /// Symbolic name, e.g. `"a"`, `"Escape"`, `" "`.
    pub key: &'static str,
    /// Legacy numeric key code, `-1` when unidentified.
    pub key_code: i32,
    /// Physical position name, e.g. `"KeyA"`.
    pub code: &'static str,
}

impl KeyIdentity {
    /// The identity every unmapped code resolves to.
    pub const UNIDENTIFIED: KeyIdentity = KeyIdentity {
        key: UNIDENTIFIED,
        key_code: UNIDENTIFIED_KEY_CODE,
        code: UNIDENTIFIED,
    };

    /// Returns `true` unless this is [`KeyIdentity::UNIDENTIFIED`].
    pub fn is_identified(&self) -> bool {
        self.key_code != UNIDENTIFIED_KEY_CODE
    }
}

/// Stateless translator from platform codes to published key identities.
pub struct KeyTranslator;

impl KeyTranslator {
    /// Places a platform code on the HID Keyboard page.
    pub fn to_hid(raw: RawKeyCode) -> HidKeyCode {
        match raw {
            RawKeyCode::Windows(vk) => windows_vk::vk_to_hid(vk),
            RawKeyCode::Linux(code) => linux_evdev::evdev_to_hid(code),
            RawKeyCode::MacOs(code) => macos_cg::cgkeycode_to_hid(code),
        }
    }

    /// Names a HID position.
    pub fn name_hid(hid: HidKeyCode) -> KeyIdentity {
        match dom::lookup(hid) {
            Some((code, key, key_code)) => KeyIdentity { key, key_code, code },
            None => KeyIdentity::UNIDENTIFIED,
        }
    }

    /// Translates a platform code to its `(key, keyCode, code)` identity.
    ///
    /// Pure and total: unmapped codes give [`KeyIdentity::UNIDENTIFIED`].
    pub fn translate(raw: RawKeyCode) -> KeyIdentity {
        Self::name_hid(Self::to_hid(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_27_on_every_platform() {
        for raw in [
            RawKeyCode::Windows(0x1B),
            RawKeyCode::Linux(1),
            RawKeyCode::MacOs(0x35),
        ] {
            let identity = KeyTranslator::translate(raw);
            assert_eq!(identity.key, "Escape", "{raw:?}");
            assert_eq!(identity.key_code, 27, "{raw:?}");
            assert_eq!(identity.code, "Escape", "{raw:?}");
        }
    }

    #[test]
    fn test_letter_a_agrees_across_platforms() {
        let expected = KeyIdentity { key: "a", key_code: 65, code: "KeyA" };
        assert_eq!(KeyTranslator::translate(RawKeyCode::Windows(0x41)), expected);
        assert_eq!(KeyTranslator::translate(RawKeyCode::Linux(30)), expected);
        assert_eq!(KeyTranslator::translate(RawKeyCode::MacOs(0x00)), expected);
    }

    #[test]
    fn test_unmapped_codes_are_unidentified() {
        for raw in [
            RawKeyCode::Windows(0x01),
            RawKeyCode::Linux(0x110),
            RawKeyCode::MacOs(0x3F),
            RawKeyCode::Windows(u32::MAX),
        ] {
            let identity = KeyTranslator::translate(raw);
            assert_eq!(identity, KeyIdentity::UNIDENTIFIED, "{raw:?}");
            assert!(!identity.is_identified());
        }
    }

    #[test]
    fn test_raw_key_code_serializes_with_platform_tag() {
        let json = serde_json::to_string(&RawKeyCode::Linux(30)).unwrap();
        assert_eq!(json, r#"{"platform":"linux","code":30}"#);
    }
}
