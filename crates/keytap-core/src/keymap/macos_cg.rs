//! macOS `CGKeyCode` to USB HID Usage ID table.
//!
//! Codes are the `kVK_*` virtual key codes from HIToolbox `Events.h`, read from
//! the `kCGKeyboardEventKeycode` field of a tapped event. They are ANSI
//! *positions*: `kVK_ANSI_A` is the key where A sits on a US keyboard.

use super::hid::HidKeyCode;

/// `kVK_*` values for the modifier keys, which arrive as `FlagsChanged`
/// events rather than `KeyDown`/`KeyUp`.
pub mod modifier {
    pub const COMMAND: u16 = 0x37;
    pub const SHIFT: u16 = 0x38;
    pub const CAPS_LOCK: u16 = 0x39;
    pub const OPTION: u16 = 0x3A;
    pub const CONTROL: u16 = 0x3B;
    pub const RIGHT_COMMAND: u16 = 0x36;
    pub const RIGHT_SHIFT: u16 = 0x3C;
    pub const RIGHT_OPTION: u16 = 0x3D;
    pub const RIGHT_CONTROL: u16 = 0x3E;
    pub const FUNCTION: u16 = 0x3F;
}

/// Translates a macOS `CGKeyCode` to a HID Usage ID.
///
/// Total over `u32`. `kVK_Function`, `kVK_ISO_Section`, the JIS keys and the
/// keypad `=`/Clear-only keys have no HID position in this table and return
/// [`HidKeyCode::Unknown`].
pub fn cgkeycode_to_hid(code: u32) -> HidKeyCode {
    use HidKeyCode::*;
    match code {
        0x00 => KeyA,
        0x0B => KeyB,
        0x08 => KeyC,
        0x02 => KeyD,
        0x0E => KeyE,
        0x03 => KeyF,
        0x05 => KeyG,
        0x04 => KeyH,
        0x22 => KeyI,
        0x26 => KeyJ,
        0x28 => KeyK,
        0x25 => KeyL,
        0x2E => KeyM,
        0x2D => KeyN,
        0x1F => KeyO,
        0x23 => KeyP,
        0x0C => KeyQ,
        0x0F => KeyR,
        0x01 => KeyS,
        0x11 => KeyT,
        0x20 => KeyU,
        0x09 => KeyV,
        0x0D => KeyW,
        0x07 => KeyX,
        0x10 => KeyY,
        0x06 => KeyZ,

        0x1D => Digit0,
        0x12 => Digit1,
        0x13 => Digit2,
        0x14 => Digit3,
        0x15 => Digit4,
        0x17 => Digit5,
        0x16 => Digit6,
        0x1A => Digit7,
        0x1C => Digit8,
        0x19 => Digit9,

        0x24 => Enter,       // kVK_Return
        0x35 => Escape,
        0x33 => Backspace,   // kVK_Delete
        0x30 => Tab,
        0x31 => Space,
        0x39 => CapsLock,
        0x72 => Insert,      // kVK_Help
        0x73 => Home,
        0x74 => PageUp,
        0x75 => Delete,      // kVK_ForwardDelete
        0x77 => End,
        0x79 => PageDown,
        0x6E => ContextMenu, // kVK_ContextualMenu

        0x7B => ArrowLeft,
        0x7C => ArrowRight,
        0x7D => ArrowDown,
        0x7E => ArrowUp,

        0x7A => F1,
        0x78 => F2,
        0x63 => F3,
        0x76 => F4,
        0x60 => F5,
        0x61 => F6,
        0x62 => F7,
        0x64 => F8,
        0x65 => F9,
        0x6D => F10,
        0x67 => F11,
        0x6F => F12,
        0x69 => F13,
        0x6B => F14,
        0x71 => F15,
        0x6A => F16,
        0x40 => F17,
        0x4F => F18,
        0x50 => F19,
        0x5A => F20,

        0x47 => NumLock,     // kVK_ANSI_KeypadClear sits where NumLock is
        0x4B => NumpadDivide,
        0x43 => NumpadMultiply,
        0x4E => NumpadSubtract,
        0x45 => NumpadAdd,
        0x4C => NumpadEnter,
        0x52 => Numpad0,
        0x53 => Numpad1,
        0x54 => Numpad2,
        0x55 => Numpad3,
        0x56 => Numpad4,
        0x57 => Numpad5,
        0x58 => Numpad6,
        0x59 => Numpad7,
        0x5B => Numpad8,
        0x5C => Numpad9,
        0x41 => NumpadDecimal,

        0x1B => Minus,
        0x18 => Equal,
        0x21 => BracketLeft,
        0x1E => BracketRight,
        0x2A => Backslash,
        0x29 => Semicolon,
        0x27 => Quote,
        0x32 => Backquote,   // kVK_ANSI_Grave
        0x2B => Comma,
        0x2F => Period,
        0x2C => Slash,

        0x3B => ControlLeft,
        0x3E => ControlRight,
        0x38 => ShiftLeft,
        0x3C => ShiftRight,
        0x3A => AltLeft,     // kVK_Option
        0x3D => AltRight,
        0x37 => MetaLeft,    // kVK_Command
        0x36 => MetaRight,

        _ => Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use HidKeyCode::*;

    #[test]
    fn test_ansi_letter_positions() {
        assert_eq!(cgkeycode_to_hid(0x00), KeyA);
        assert_eq!(cgkeycode_to_hid(0x0C), KeyQ);
        assert_eq!(cgkeycode_to_hid(0x06), KeyZ);
        assert_eq!(cgkeycode_to_hid(0x2E), KeyM);
    }

    #[test]
    fn test_every_letter_is_reachable() {
        let mapped: std::collections::HashSet<_> = (0u32..=0x7F).map(cgkeycode_to_hid).collect();
        for letter in &HidKeyCode::ALL[..26] {
            assert!(mapped.contains(letter), "{letter:?} has no CGKeyCode");
        }
    }

    #[test]
    fn test_return_and_delete_naming_differences() {
        // macOS calls Backspace "Delete" and Delete "ForwardDelete".
        assert_eq!(cgkeycode_to_hid(0x24), Enter);
        assert_eq!(cgkeycode_to_hid(0x33), Backspace);
        assert_eq!(cgkeycode_to_hid(0x75), Delete);
    }

    #[test]
    fn test_modifier_constants_map_to_sided_modifiers() {
        assert_eq!(cgkeycode_to_hid(modifier::COMMAND.into()), MetaLeft);
        assert_eq!(cgkeycode_to_hid(modifier::RIGHT_COMMAND.into()), MetaRight);
        assert_eq!(cgkeycode_to_hid(modifier::SHIFT.into()), ShiftLeft);
        assert_eq!(cgkeycode_to_hid(modifier::RIGHT_SHIFT.into()), ShiftRight);
        assert_eq!(cgkeycode_to_hid(modifier::OPTION.into()), AltLeft);
        assert_eq!(cgkeycode_to_hid(modifier::RIGHT_OPTION.into()), AltRight);
        assert_eq!(cgkeycode_to_hid(modifier::CONTROL.into()), ControlLeft);
        assert_eq!(cgkeycode_to_hid(modifier::RIGHT_CONTROL.into()), ControlRight);
        assert_eq!(cgkeycode_to_hid(modifier::CAPS_LOCK.into()), CapsLock);
    }

    #[test]
    fn test_function_key_and_iso_section_are_unknown() {
        assert_eq!(cgkeycode_to_hid(modifier::FUNCTION.into()), Unknown);
        assert_eq!(cgkeycode_to_hid(0x0A), Unknown); // kVK_ISO_Section
        assert_eq!(cgkeycode_to_hid(0x80), Unknown);
        assert_eq!(cgkeycode_to_hid(u32::MAX), Unknown);
    }
}
