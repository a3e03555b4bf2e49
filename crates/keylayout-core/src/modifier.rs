// Keylayout Modifier Transformer
// Abstract modifier sets and the platform's native modifier bitmask

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;

bitflags! {
    /// Modifier keys held while a key is translated.
    ///
    /// Order is irrelevant; only the combination determines the output.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ModifierSet: u8 {
        const SHIFT = 1 << 0;
        const OPTION = 1 << 1;
        const CONTROL = 1 << 2;
        const COMMAND = 1 << 3;
        const CAPS_LOCK = 1 << 4;
        const FUNCTION = 1 << 5;
    }
}

bitflags! {
    /// Native (Carbon event) modifier bits consumed by the translation primitive.
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct NativeModifiers: u32 {
        const COMMAND = 0x0100;
        const SHIFT = 0x0200;
        const ALPHA_LOCK = 0x0400;
        const OPTION = 0x0800;
        const CONTROL = 0x1000;
        const RIGHT_SHIFT = 0x2000;
        const RIGHT_OPTION = 0x4000;
        const RIGHT_CONTROL = 0x8000;
        const FUNCTION = 0x0002_0000;
    }
}

/// One abstract modifier paired with its native bit.
const NATIVE_PAIRS: [(ModifierSet, NativeModifiers); 6] = [
    (ModifierSet::SHIFT, NativeModifiers::SHIFT),
    (ModifierSet::OPTION, NativeModifiers::OPTION),
    (ModifierSet::CONTROL, NativeModifiers::CONTROL),
    (ModifierSet::COMMAND, NativeModifiers::COMMAND),
    (ModifierSet::CAPS_LOCK, NativeModifiers::ALPHA_LOCK),
    (ModifierSet::FUNCTION, NativeModifiers::FUNCTION),
];

/// Convert an abstract modifier set into native bits (bitwise OR of one bit each).
pub fn to_native_flags(modifiers: ModifierSet) -> NativeModifiers {
    NATIVE_PAIRS
        .iter()
        .filter(|(abstract_bit, _)| modifiers.contains(*abstract_bit))
        .fold(NativeModifiers::empty(), |acc, (_, native)| acc | *native)
}

/// Convert native bits back into an abstract modifier set.
///
/// Right-hand variants fold into their generic modifier; any other unknown
/// bit is ignored.
pub fn from_native_flags(native: NativeModifiers) -> ModifierSet {
    let mut native = native;
    if native.contains(NativeModifiers::RIGHT_SHIFT) {
        native |= NativeModifiers::SHIFT;
    }
    if native.contains(NativeModifiers::RIGHT_OPTION) {
        native |= NativeModifiers::OPTION;
    }
    if native.contains(NativeModifiers::RIGHT_CONTROL) {
        native |= NativeModifiers::CONTROL;
    }
    NATIVE_PAIRS
        .iter()
        .filter(|(_, native_bit)| native.contains(*native_bit))
        .fold(ModifierSet::empty(), |acc, (abstract_bit, _)| acc | *abstract_bit)
}

impl From<ModifierSet> for NativeModifiers {
    fn from(modifiers: ModifierSet) -> Self {
        to_native_flags(modifiers)
    }
}

impl From<NativeModifiers> for ModifierSet {
    fn from(native: NativeModifiers) -> Self {
        from_native_flags(native)
    }
}

impl NativeModifiers {
    /// Build from raw bits, dropping anything that is not a known modifier.
    pub fn from_raw(bits: u32) -> Self {
        Self::from_bits_truncate(bits)
    }

    /// The modifier key state byte handed to the key translation primitive.
    pub fn key_translate_state(self) -> u32 {
        (self.bits() >> 8) & 0xff
    }
}

/// Errors that can occur when parsing modifiers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModifierError {
    #[error("empty modifier name")]
    Empty,

    #[error("unknown modifier '{0}'")]
    Unknown(String),
}

impl ModifierSet {
    /// Look up a single modifier by name or alias (case-insensitive).
    pub fn from_alias(alias: &str) -> Option<ModifierSet> {
        let flag = match alias.trim().to_ascii_lowercase().as_str() {
            "shift" => ModifierSet::SHIFT,
            "opt" | "option" | "alt" => ModifierSet::OPTION,
            "ctrl" | "control" => ModifierSet::CONTROL,
            "cmd" | "command" | "meta" | "super" => ModifierSet::COMMAND,
            "caps" | "capslock" | "caps_lock" => ModifierSet::CAPS_LOCK,
            "fn" | "function" => ModifierSet::FUNCTION,
            _ => return None,
        };
        Some(flag)
    }

    /// Primary name of a single-flag set
    fn primary_alias(self) -> &'static str {
        if self == ModifierSet::SHIFT {
            "shift"
        } else if self == ModifierSet::OPTION {
            "option"
        } else if self == ModifierSet::CONTROL {
            "control"
        } else if self == ModifierSet::COMMAND {
            "command"
        } else if self == ModifierSet::CAPS_LOCK {
            "caps_lock"
        } else {
            "fn"
        }
    }
}

impl FromStr for ModifierSet {
    type Err = ModifierError;

    /// Parse `"shift+option"`, `"Cmd-Shift"` or `"none"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ModifierError::Empty);
        }
        if trimmed.eq_ignore_ascii_case("none") {
            return Ok(ModifierSet::empty());
        }
        trimmed
            .split(|c| c == '+' || c == '-')
            .try_fold(ModifierSet::empty(), |acc, part| {
                if part.trim().is_empty() {
                    return Err(ModifierError::Empty);
                }
                ModifierSet::from_alias(part)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| ModifierError::Unknown(part.trim().to_string()))
            })
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.iter().map(|flag| flag.primary_alias()).collect();
        write!(f, "{}", names.join("+"))
    }
}
