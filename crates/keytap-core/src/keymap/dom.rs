//! Naming table: HID position to `(key, keyCode, code)`.
//!
//! `key` follows the browser `KeyboardEvent.key` vocabulary for a US layout
//! with no modifiers held, `keyCode` follows the legacy `KeyboardEvent.keyCode`
//! numbering and `code` is the `KeyboardEvent.code` position name.
//!
//! The table is frozen per [`KEY_TABLE_VERSION`]. Changing any published
//! string or number requires bumping the version.

use super::hid::HidKeyCode;

/// Version of the naming table below.
pub const KEY_TABLE_VERSION: u32 = 1;

/// `key` and `code` for anything the table cannot name.
pub const UNIDENTIFIED: &str = "Unidentified";

/// `keyCode` for anything the table cannot name.
pub const UNIDENTIFIED_KEY_CODE: i32 = -1;

/// Returns `(code, key, keyCode)` for a HID position, or `None` for
/// [`HidKeyCode::Unknown`].
pub fn lookup(hid: HidKeyCode) -> Option<(&'static str, &'static str, i32)> {
    use HidKeyCode::*;
    let entry = match hid {
        KeyA => ("KeyA", "a", 65),
        KeyB => ("KeyB", "b", 66),
        KeyC => ("KeyC", "c", 67),
        KeyD => ("KeyD", "d", 68),
        KeyE => ("KeyE", "e", 69),
        KeyF => ("KeyF", "f", 70),
        KeyG => ("KeyG", "g", 71),
        KeyH => ("KeyH", "h", 72),
        KeyI => ("KeyI", "i", 73),
        KeyJ => ("KeyJ", "j", 74),
        KeyK => ("KeyK", "k", 75),
        KeyL => ("KeyL", "l", 76),
        KeyM => ("KeyM", "m", 77),
        KeyN => ("KeyN", "n", 78),
        KeyO => ("KeyO", "o", 79),
        KeyP => ("KeyP", "p", 80),
        KeyQ => ("KeyQ", "q", 81),
        KeyR => ("KeyR", "r", 82),
        KeyS => ("KeyS", "s", 83),
        KeyT => ("KeyT", "t", 84),
        KeyU => ("KeyU", "u", 85),
        KeyV => ("KeyV", "v", 86),
        KeyW => ("KeyW", "w", 87),
        KeyX => ("KeyX", "x", 88),
        KeyY => ("KeyY", "y", 89),
        KeyZ => ("KeyZ", "z", 90),

        Digit0 => ("Digit0", "0", 48),
        Digit1 => ("Digit1", "1", 49),
        Digit2 => ("Digit2", "2", 50),
        Digit3 => ("Digit3", "3", 51),
        Digit4 => ("Digit4", "4", 52),
        Digit5 => ("Digit5", "5", 53),
        Digit6 => ("Digit6", "6", 54),
        Digit7 => ("Digit7", "7", 55),
        Digit8 => ("Digit8", "8", 56),
        Digit9 => ("Digit9", "9", 57),

        Enter => ("Enter", "Enter", 13),
        Escape => ("Escape", "Escape", 27),
        Backspace => ("Backspace", "Backspace", 8),
        Tab => ("Tab", "Tab", 9),
        Space => ("Space", " ", 32),
        CapsLock => ("CapsLock", "CapsLock", 20),
        NumLock => ("NumLock", "NumLock", 144),
        ScrollLock => ("ScrollLock", "ScrollLock", 145),

        ShiftLeft => ("ShiftLeft", "Shift", 16),
        ShiftRight => ("ShiftRight", "Shift", 16),
        ControlLeft => ("ControlLeft", "Control", 17),
        ControlRight => ("ControlRight", "Control", 17),
        AltLeft => ("AltLeft", "Alt", 18),
        AltRight => ("AltRight", "Alt", 18),
        MetaLeft => ("MetaLeft", "Meta", 91),
        MetaRight => ("MetaRight", "Meta", 92),
        ContextMenu => ("ContextMenu", "ContextMenu", 93),

        F1 => ("F1", "F1", 112),
        F2 => ("F2", "F2", 113),
        F3 => ("F3", "F3", 114),
        F4 => ("F4", "F4", 115),
        F5 => ("F5", "F5", 116),
        F6 => ("F6", "F6", 117),
        F7 => ("F7", "F7", 118),
        F8 => ("F8", "F8", 119),
        F9 => ("F9", "F9", 120),
        F10 => ("F10", "F10", 121),
        F11 => ("F11", "F11", 122),
        F12 => ("F12", "F12", 123),
        F13 => ("F13", "F13", 124),
        F14 => ("F14", "F14", 125),
        F15 => ("F15", "F15", 126),
        F16 => ("F16", "F16", 127),
        F17 => ("F17", "F17", 128),
        F18 => ("F18", "F18", 129),
        F19 => ("F19", "F19", 130),
        F20 => ("F20", "F20", 131),
        F21 => ("F21", "F21", 132),
        F22 => ("F22", "F22", 133),
        F23 => ("F23", "F23", 134),
        F24 => ("F24", "F24", 135),

        ArrowLeft => ("ArrowLeft", "ArrowLeft", 37),
        ArrowUp => ("ArrowUp", "ArrowUp", 38),
        ArrowRight => ("ArrowRight", "ArrowRight", 39),
        ArrowDown => ("ArrowDown", "ArrowDown", 40),
        PageUp => ("PageUp", "PageUp", 33),
        PageDown => ("PageDown", "PageDown", 34),
        End => ("End", "End", 35),
        Home => ("Home", "Home", 36),
        Insert => ("Insert", "Insert", 45),
        Delete => ("Delete", "Delete", 46),
        PrintScreen => ("PrintScreen", "PrintScreen", 44),
        Pause => ("Pause", "Pause", 19),

        Minus => ("Minus", "-", 189),
        Equal => ("Equal", "=", 187),
        BracketLeft => ("BracketLeft", "[", 219),
        BracketRight => ("BracketRight", "]", 221),
        Backslash => ("Backslash", "\\", 220),
        Semicolon => ("Semicolon", ";", 186),
        Quote => ("Quote", "'", 222),
        Backquote => ("Backquote", "`", 192),
        Comma => ("Comma", ",", 188),
        Period => ("Period", ".", 190),
        Slash => ("Slash", "/", 191),

        Numpad0 => ("Numpad0", "0", 96),
        Numpad1 => ("Numpad1", "1", 97),
        Numpad2 => ("Numpad2", "2", 98),
        Numpad3 => ("Numpad3", "3", 99),
        Numpad4 => ("Numpad4", "4", 100),
        Numpad5 => ("Numpad5", "5", 101),
        Numpad6 => ("Numpad6", "6", 102),
        Numpad7 => ("Numpad7", "7", 103),
        Numpad8 => ("Numpad8", "8", 104),
        Numpad9 => ("Numpad9", "9", 105),
        NumpadMultiply => ("NumpadMultiply", "*", 106),
        NumpadAdd => ("NumpadAdd", "+", 107),
        NumpadSubtract => ("NumpadSubtract", "-", 109),
        NumpadDecimal => ("NumpadDecimal", ".", 110),
        NumpadDivide => ("NumpadDivide", "/", 111),
        NumpadEnter => ("NumpadEnter", "Enter", 13),

        Unknown => return None,
    };
    Some(entry)
}
