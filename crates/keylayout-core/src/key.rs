// Keylayout Key Catalog
// Physical key codes and the fixed set of logical keys they are indexed by

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// A physical key position, independent of the active layout.
///
/// The numeric values are the macOS virtual key codes (`kVK_*`), which is
/// also the code space every [`KeyboardPlatform`](crate::KeyboardPlatform)
/// translates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct KeyCode(pub u16);

impl KeyCode {
    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }
}

impl From<u16> for KeyCode {
    fn from(code: u16) -> Self {
        KeyCode(code)
    }
}

impl From<KeyCode> for u16 {
    fn from(code: KeyCode) -> Self {
        code.0
    }
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

/// Abstract key, named after the character or function it carries on the
/// reference (ANSI/US) layout.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumIter,
    EnumString,
    Display,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LogicalKey {
    // Letters
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,
    // Digits
    Zero,
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    // Symbols
    Equal,
    Minus,
    RightBracket,
    LeftBracket,
    Quote,
    Semicolon,
    Backslash,
    Comma,
    Slash,
    Period,
    Grave,
    Section,
    // JIS symbols
    Yen,
    Underscore,
    AtSign,
    Caret,
    Colon,
    // Keypad
    KeypadDecimal,
    KeypadMultiply,
    KeypadPlus,
    KeypadClear,
    KeypadDivide,
    KeypadEnter,
    KeypadMinus,
    KeypadEquals,
    KeypadComma,
    Keypad0,
    Keypad1,
    Keypad2,
    Keypad3,
    Keypad4,
    Keypad5,
    Keypad6,
    Keypad7,
    Keypad8,
    Keypad9,
    // Editing and control
    Return,
    Tab,
    Space,
    Delete,
    ForwardDelete,
    Escape,
    Help,
    Home,
    End,
    PageUp,
    PageDown,
    LeftArrow,
    RightArrow,
    DownArrow,
    UpArrow,
    Eisu,
    Kana,
    // Modifiers
    Command,
    RightCommand,
    Shift,
    RightShift,
    CapsLock,
    Option,
    RightOption,
    Control,
    RightControl,
    Function,
    // Media
    VolumeUp,
    VolumeDown,
    Mute,
    // Function row
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    F13,
    F14,
    F15,
    F16,
    F17,
    F18,
    F19,
    F20,
}

impl LogicalKey {
    /// The physical code this key occupies on the reference layout.
    ///
    /// Only a seed for lookups; the active layout may place the key elsewhere.
    pub const fn reference_key_code(self) -> KeyCode {
        use LogicalKey::*;
        let code = match self {
            A => 0x00,
            S => 0x01,
            D => 0x02,
            F => 0x03,
            H => 0x04,
            G => 0x05,
            Z => 0x06,
            X => 0x07,
            C => 0x08,
            V => 0x09,
            Section => 0x0a,
            B => 0x0b,
            Q => 0x0c,
            W => 0x0d,
            E => 0x0e,
            R => 0x0f,
            Y => 0x10,
            T => 0x11,
            One => 0x12,
            Two => 0x13,
            Three => 0x14,
            Four => 0x15,
            Six => 0x16,
            Five => 0x17,
            Equal | Caret => 0x18,
            Nine => 0x19,
            Seven => 0x1a,
            Minus => 0x1b,
            Eight => 0x1c,
            Zero => 0x1d,
            RightBracket => 0x1e,
            O => 0x1f,
            U => 0x20,
            LeftBracket | AtSign => 0x21,
            I => 0x22,
            P => 0x23,
            Return => 0x24,
            L => 0x25,
            J => 0x26,
            Quote | Colon => 0x27,
            K => 0x28,
            Semicolon => 0x29,
            Backslash => 0x2a,
            Comma => 0x2b,
            Slash => 0x2c,
            N => 0x2d,
            M => 0x2e,
            Period => 0x2f,
            Tab => 0x30,
            Space => 0x31,
            Grave => 0x32,
            Delete => 0x33,
            Escape => 0x35,
            RightCommand => 0x36,
            Command => 0x37,
            Shift => 0x38,
            CapsLock => 0x39,
            Option => 0x3a,
            Control => 0x3b,
            RightShift => 0x3c,
            RightOption => 0x3d,
            RightControl => 0x3e,
            Function => 0x3f,
            F17 => 0x40,
            KeypadDecimal => 0x41,
            KeypadMultiply => 0x43,
            KeypadPlus => 0x45,
            KeypadClear => 0x47,
            VolumeUp => 0x48,
            VolumeDown => 0x49,
            Mute => 0x4a,
            KeypadDivide => 0x4b,
            KeypadEnter => 0x4c,
            KeypadMinus => 0x4e,
            F18 => 0x4f,
            F19 => 0x50,
            KeypadEquals => 0x51,
            Keypad0 => 0x52,
            Keypad1 => 0x53,
            Keypad2 => 0x54,
            Keypad3 => 0x55,
            Keypad4 => 0x56,
            Keypad5 => 0x57,
            Keypad6 => 0x58,
            Keypad7 => 0x59,
            F20 => 0x5a,
            Keypad8 => 0x5b,
            Keypad9 => 0x5c,
            Yen => 0x5d,
            Underscore => 0x5e,
            KeypadComma => 0x5f,
            F5 => 0x60,
            F6 => 0x61,
            F7 => 0x62,
            F3 => 0x63,
            F8 => 0x64,
            F9 => 0x65,
            Eisu => 0x66,
            F11 => 0x67,
            Kana => 0x68,
            F13 => 0x69,
            F16 => 0x6a,
            F14 => 0x6b,
            F10 => 0x6d,
            F12 => 0x6f,
            F15 => 0x71,
            Help => 0x72,
            Home => 0x73,
            PageUp => 0x74,
            ForwardDelete => 0x75,
            F4 => 0x76,
            End => 0x77,
            F2 => 0x78,
            PageDown => 0x79,
            F1 => 0x7a,
            LeftArrow => 0x7b,
            RightArrow => 0x7c,
            DownArrow => 0x7d,
            UpArrow => 0x7e,
        };
        KeyCode(code)
    }

    /// The character this key is recognised by, for keys whose meaning moves
    /// with the layout. `None` for keys recognised by position.
    pub const fn canonical_character(self) -> Option<char> {
        use LogicalKey::*;
        let ch = match self {
            A => 'a',
            B => 'b',
            C => 'c',
            D => 'd',
            E => 'e',
            F => 'f',
            G => 'g',
            H => 'h',
            I => 'i',
            J => 'j',
            K => 'k',
            L => 'l',
            M => 'm',
            N => 'n',
            O => 'o',
            P => 'p',
            Q => 'q',
            R => 'r',
            S => 's',
            T => 't',
            U => 'u',
            V => 'v',
            W => 'w',
            X => 'x',
            Y => 'y',
            Z => 'z',
            Zero => '0',
            One => '1',
            Two => '2',
            Three => '3',
            Four => '4',
            Five => '5',
            Six => '6',
            Seven => '7',
            Eight => '8',
            Nine => '9',
            Equal => '=',
            Minus => '-',
            RightBracket => ']',
            LeftBracket => '[',
            Quote => '\'',
            Semicolon => ';',
            Backslash => '\\',
            Comma => ',',
            Slash => '/',
            Period => '.',
            Grave => '`',
            Section => '§',
            Yen => '¥',
            Underscore => '_',
            AtSign => '@',
            Caret => '^',
            Colon => ':',
            _ => return None,
        };
        Some(ch)
    }

    /// Whether this key is identified by its physical position on every layout.
    pub const fn is_position_fixed(self) -> bool {
        self.canonical_character().is_none()
    }

    /// The position-fixed key at `code`, if any.
    pub fn fixed_at(code: KeyCode) -> Option<LogicalKey> {
        static FIXED: OnceLock<HashMap<KeyCode, LogicalKey>> = OnceLock::new();
        FIXED
            .get_or_init(|| {
                LogicalKey::iter()
                    .filter(|key| key.is_position_fixed())
                    .map(|key| (key.reference_key_code(), key))
                    .collect()
            })
            .get(&code)
            .copied()
    }

    /// The character-identified key for `ch`, ignoring case.
    pub fn from_char(ch: char) -> Option<LogicalKey> {
        static BY_CHAR: OnceLock<HashMap<char, LogicalKey>> = OnceLock::new();
        let map = BY_CHAR.get_or_init(|| {
            LogicalKey::iter()
                .filter_map(|key| key.canonical_character().map(|ch| (ch, key)))
                .collect()
        });
        let mut lowered = ch.to_lowercase();
        let lower = match (lowered.next(), lowered.next()) {
            (Some(lower), None) => lower,
            _ => ch,
        };
        map.get(&lower).copied()
    }

    /// Recognise the logical key produced at `code` given the text it types.
    ///
    /// Position-fixed keys win over the produced text, so keypad digits are
    /// never mistaken for the number row.
    pub fn from_character(text: &str, code: KeyCode) -> Option<LogicalKey> {
        if let Some(key) = Self::fixed_at(code) {
            return Some(key);
        }
        let mut chars = text.chars();
        let ch = chars.next()?;
        if chars.next().is_some() {
            return None;
        }
        Self::from_char(ch)
    }

    /// Get the snake_case name of this key
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::str::FromStr;

    #[test]
    fn test_reference_key_codes() {
        assert_eq!(LogicalKey::V.reference_key_code(), KeyCode(9));
        assert_eq!(LogicalKey::A.reference_key_code(), KeyCode(0));
        assert_eq!(LogicalKey::Period.reference_key_code(), KeyCode(0x2f));
        assert_eq!(LogicalKey::F1.reference_key_code(), KeyCode(0x7a));
        assert_eq!(LogicalKey::Yen.reference_key_code(), KeyCode(0x5d));
    }

    #[test]
    fn test_fixed_keys_have_unique_positions() {
        let mut seen = HashSet::new();
        for key in LogicalKey::iter().filter(|k| k.is_position_fixed()) {
            assert!(
                seen.insert(key.reference_key_code()),
                "{} shares a position with another fixed key",
                key
            );
        }
    }

    #[test]
    fn test_canonical_characters_are_unique() {
        let mut seen = HashSet::new();
        for ch in LogicalKey::iter().filter_map(|k| k.canonical_character()) {
            assert!(seen.insert(ch), "duplicate canonical character {:?}", ch);
        }
    }

    #[test]
    fn test_from_character_by_text() {
        assert_eq!(LogicalKey::from_character("v", KeyCode(9)), Some(LogicalKey::V));
        assert_eq!(LogicalKey::from_character("V", KeyCode(47)), Some(LogicalKey::V));
        assert_eq!(LogicalKey::from_character("'", KeyCode(12)), Some(LogicalKey::Quote));
        assert_eq!(LogicalKey::from_character("¥", KeyCode(0x5d)), Some(LogicalKey::Yen));
    }

    #[test]
    fn test_from_character_prefers_fixed_position() {
        // Keypad 1 types "1" but is not the number-row key
        assert_eq!(
            LogicalKey::from_character("1", KeyCode(0x53)),
            Some(LogicalKey::Keypad1)
        );
        assert_eq!(
            LogicalKey::from_character("\r", KeyCode(0x24)),
            Some(LogicalKey::Return)
        );
    }

    #[test]
    fn test_from_character_rejects_unknown_text() {
        assert_eq!(LogicalKey::from_character("√", KeyCode(9)), None);
        assert_eq!(LogicalKey::from_character("", KeyCode(9)), None);
        assert_eq!(LogicalKey::from_character("ab", KeyCode(9)), None);
    }

    #[test]
    fn test_key_names_round_trip() {
        assert_eq!(LogicalKey::RightBracket.to_string(), "right_bracket");
        assert_eq!(LogicalKey::from_str("right_bracket"), Ok(LogicalKey::RightBracket));
        assert_eq!(LogicalKey::from_str("V"), Ok(LogicalKey::V));
        assert!(LogicalKey::from_str("no_such_key").is_err());
        assert_eq!(LogicalKey::V.name(), "v");
    }

    #[test]
    fn test_key_code_display() {
        assert_eq!(KeyCode(9).to_string(), "0x09");
        assert_eq!(KeyCode::from(0x7e).code(), 0x7e);
        assert_eq!(u16::from(KeyCode(47)), 47);
    }
}
