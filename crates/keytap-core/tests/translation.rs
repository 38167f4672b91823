//! Integration tests for the public translation API.
//!
//! These walk whole input domains rather than spot values: translation must be
//! total and must agree with the naming table for every code it can place.

use keytap_core::keymap::{dom, HidKeyCode, KeyIdentity, KeyTranslator, RawKeyCode};
use keytap_core::{KeyEvent, KEY_TABLE_VERSION};

#[test]
fn test_key_table_version_is_one() {
    assert_eq!(KEY_TABLE_VERSION, 1);
}

#[test]
fn test_every_windows_vk_translates_without_panicking() {
    for vk in 0u32..=0xFF {
        let identity = KeyTranslator::translate(RawKeyCode::Windows(vk));
        assert_eq!(
            identity.is_identified(),
            KeyTranslator::to_hid(RawKeyCode::Windows(vk)) != HidKeyCode::Unknown,
            "VK 0x{vk:02X}"
        );
    }
}

#[test]
fn test_every_evdev_code_translates_without_panicking() {
    for code in 0u32..=0x2FF {
        let identity = KeyTranslator::translate(RawKeyCode::Linux(code));
        if identity.is_identified() {
            assert!(identity.key_code > 0, "evdev {code}");
        } else {
            assert_eq!(identity, KeyIdentity::UNIDENTIFIED, "evdev {code}");
        }
    }
}

#[test]
fn test_every_cgkeycode_translates_without_panicking() {
    for code in 0u32..=0xFF {
        let _ = KeyTranslator::translate(RawKeyCode::MacOs(code));
    }
}

#[test]
fn test_each_platform_reaches_every_letter_and_digit() {
    // Arrange
    let windows: Vec<KeyIdentity> = (0u32..=0xFF)
        .map(|c| KeyTranslator::translate(RawKeyCode::Windows(c)))
        .collect();
    let linux: Vec<KeyIdentity> = (0u32..=0x2FF)
        .map(|c| KeyTranslator::translate(RawKeyCode::Linux(c)))
        .collect();
    let macos: Vec<KeyIdentity> = (0u32..=0x7F)
        .map(|c| KeyTranslator::translate(RawKeyCode::MacOs(c)))
        .collect();

    // Assert
    for key_code in (65..=90).chain(48..=57) {
        for (platform, table) in [("windows", &windows), ("linux", &linux), ("macos", &macos)] {
            assert!(
                table.iter().any(|identity| identity.key_code == key_code),
                "{platform} cannot produce keyCode {key_code}"
            );
        }
    }
}

#[test]
fn test_translation_matches_naming_table_for_every_hid_position() {
    for &hid in HidKeyCode::ALL {
        let (code, key, key_code) = dom::lookup(hid).expect("mapped HID code must be named");
        assert_eq!(
            KeyTranslator::name_hid(hid),
            KeyIdentity { key, key_code, code }
        );
    }
}

#[test]
fn test_escape_scenario_on_windows() {
    // Arrange
    let raw = RawKeyCode::Windows(0x1B);

    // Act
    let down = KeyEvent::from_raw(raw, false, false);
    let up = KeyEvent::from_raw(raw, true, false);

    // Assert
    assert_eq!(down.as_tuple(), ("Escape", false, 27));
    assert_eq!(up.as_tuple(), ("Escape", true, 27));
}

#[test]
fn test_numpad_enter_shares_enter_key_code_but_not_position() {
    let main = KeyTranslator::translate(RawKeyCode::Linux(28));
    let keypad = KeyTranslator::translate(RawKeyCode::Linux(96));

    assert_eq!((main.key, main.key_code), ("Enter", 13));
    assert_eq!((keypad.key, keypad.key_code), ("Enter", 13));
    assert_eq!(main.code, "Enter");
    assert_eq!(keypad.code, "NumpadEnter");
}
