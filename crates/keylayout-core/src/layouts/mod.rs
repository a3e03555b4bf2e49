// Keylayout Layout Tables
// Table-driven key translation used by the in-memory platform

mod abc;
mod deadkeys;
mod dvorak;

use std::collections::BTreeMap;

use crate::platform::{DeadKeyMode, DeadKeyState, Translation};
use crate::{KeyCode, NativeModifiers};

pub use abc::{abc, us};
pub use deadkeys::DeadKeyKind;
pub use dvorak::dvorak;

// Modifier key state byte bits (see `NativeModifiers::key_translate_state`)
const STATE_SHIFT: u32 = 0x02;
const STATE_ALPHA_LOCK: u32 = 0x04;
const STATE_OPTION: u32 = 0x08;
const STATE_CONTROL: u32 = 0x10;

/// What one layer of a key produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutput {
    Char(char),
    Dead(DeadKeyKind),
    Nothing,
}

/// The four layers of one physical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySlot {
    pub base: KeyOutput,
    pub shift: KeyOutput,
    pub option: KeyOutput,
    pub shift_option: KeyOutput,
}

impl KeySlot {
    pub const fn new(
        base: KeyOutput,
        shift: KeyOutput,
        option: KeyOutput,
        shift_option: KeyOutput,
    ) -> Self {
        Self {
            base,
            shift,
            option,
            shift_option,
        }
    }

    /// Same output on every layer
    pub const fn uniform(output: KeyOutput) -> Self {
        Self::new(output, output, output, output)
    }

    fn layer(&self, shift: bool, option: bool) -> KeyOutput {
        match (shift, option) {
            (false, false) => self.base,
            (true, false) => self.shift,
            (false, true) => self.option,
            (true, true) => self.shift_option,
        }
    }
}

/// Key layout data for one input source: physical code to layered output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutTable {
    id: String,
    slots: BTreeMap<KeyCode, KeySlot>,
}

impl LayoutTable {
    pub fn builder(id: impl Into<String>) -> LayoutTableBuilder {
        LayoutTableBuilder {
            id: id.into(),
            slots: BTreeMap::new(),
        }
    }

    /// Identifier of the input source this data was taken from
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn slot(&self, code: KeyCode) -> Option<&KeySlot> {
        self.slots.get(&code)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Lowest code whose base layer types `ch`
    pub fn code_for_base(&self, ch: char) -> Option<KeyCode> {
        self.slots
            .iter()
            .find(|(_, slot)| slot.base == KeyOutput::Char(ch))
            .map(|(code, _)| *code)
    }

    /// Translate one key press.
    ///
    /// Caps lock upper-cases letters, control turns letters into control
    /// characters, command is ignored. A pending dead key is resolved by the
    /// next character-producing key and cleared by anything else.
    pub fn translate(
        &self,
        code: KeyCode,
        modifiers: NativeModifiers,
        dead_key_state: &mut DeadKeyState,
        mode: DeadKeyMode,
    ) -> Translation {
        let Some(slot) = self.slots.get(&code) else {
            if mode == DeadKeyMode::Compose {
                dead_key_state.clear();
            }
            return Translation::empty();
        };

        let state = modifiers.key_translate_state();
        let shift = state & STATE_SHIFT != 0;
        let output = match slot.layer(shift, state & STATE_OPTION != 0) {
            KeyOutput::Char(ch) if state & STATE_ALPHA_LOCK != 0 && !shift => {
                KeyOutput::Char(single_uppercase(ch))
            }
            other => other,
        };

        match (output, mode) {
            (KeyOutput::Nothing, DeadKeyMode::Compose) => {
                dead_key_state.clear();
                Translation::empty()
            }
            (KeyOutput::Nothing, DeadKeyMode::Suppress) => Translation::empty(),
            (KeyOutput::Dead(kind), DeadKeyMode::Compose) => {
                // A second dead key replaces the pending one
                *dead_key_state = kind.to_state();
                Translation::dead_key_start()
            }
            (KeyOutput::Dead(kind), DeadKeyMode::Suppress) => {
                Translation::text(kind.standalone().to_string())
            }
            (KeyOutput::Char(ch), mode) => {
                let ch = if state & STATE_CONTROL != 0 {
                    control_character(ch)
                } else {
                    ch
                };
                let pending = match mode {
                    DeadKeyMode::Compose => DeadKeyKind::from_state(*dead_key_state),
                    DeadKeyMode::Suppress => None,
                };
                match pending {
                    Some(kind) => {
                        dead_key_state.clear();
                        Translation::text(kind.resolve(ch))
                    }
                    None => Translation::text(ch.to_string()),
                }
            }
        }
    }
}

fn single_uppercase(ch: char) -> char {
    let mut upper = ch.to_uppercase();
    match (upper.next(), upper.next()) {
        (Some(u), None) => u,
        _ => ch,
    }
}

fn control_character(ch: char) -> char {
    if ch.is_ascii_alphabetic() {
        char::from(ch.to_ascii_uppercase() as u8 & 0x1f)
    } else {
        ch
    }
}

/// Builder for [`LayoutTable`]
#[derive(Debug, Clone)]
pub struct LayoutTableBuilder {
    id: String,
    slots: BTreeMap<KeyCode, KeySlot>,
}

impl LayoutTableBuilder {
    /// Key with base and shift characters and nothing on the option layers
    pub fn key(self, code: u16, base: char, shift: char) -> Self {
        self.slot(
            code,
            KeySlot::new(
                KeyOutput::Char(base),
                KeyOutput::Char(shift),
                KeyOutput::Nothing,
                KeyOutput::Nothing,
            ),
        )
    }

    pub fn slot(mut self, code: u16, slot: KeySlot) -> Self {
        self.slots.insert(KeyCode(code), slot);
        self
    }

    /// Copy every slot of `table`
    pub fn extend_from(mut self, table: &LayoutTable) -> Self {
        self.slots
            .extend(table.slots.iter().map(|(code, slot)| (*code, *slot)));
        self
    }

    /// Add the keys whose output is the same on every layout: editing keys,
    /// keypad, arrows and the function row.
    pub fn standard_keys(mut self) -> Self {
        const FUNCTION_KEY: char = '\u{10}';
        const FIXED: [(u16, char); 42] = [
            (0x24, '\r'),
            (0x30, '\t'),
            (0x33, '\u{8}'),
            (0x35, '\u{1b}'),
            (0x41, '.'),
            (0x43, '*'),
            (0x45, '+'),
            (0x47, '\u{1b}'),
            (0x4b, '/'),
            (0x4c, '\u{3}'),
            (0x4e, '-'),
            (0x51, '='),
            (0x52, '0'),
            (0x53, '1'),
            (0x54, '2'),
            (0x55, '3'),
            (0x56, '4'),
            (0x57, '5'),
            (0x58, '6'),
            (0x59, '7'),
            (0x5b, '8'),
            (0x5c, '9'),
            (0x72, '\u{5}'),
            (0x73, '\u{1}'),
            (0x74, '\u{b}'),
            (0x75, '\u{7f}'),
            (0x77, '\u{4}'),
            (0x79, '\u{c}'),
            (0x7b, '\u{1c}'),
            (0x7c, '\u{1d}'),
            (0x7d, '\u{1f}'),
            (0x7e, '\u{1e}'),
            (0x7a, FUNCTION_KEY),
            (0x78, FUNCTION_KEY),
            (0x63, FUNCTION_KEY),
            (0x76, FUNCTION_KEY),
            (0x60, FUNCTION_KEY),
            (0x61, FUNCTION_KEY),
            (0x62, FUNCTION_KEY),
            (0x64, FUNCTION_KEY),
            (0x65, FUNCTION_KEY),
            (0x6d, FUNCTION_KEY),
        ];
        const MORE_FUNCTION_KEYS: [u16; 10] =
            [0x67, 0x6f, 0x69, 0x6b, 0x71, 0x6a, 0x40, 0x4f, 0x50, 0x5a];

        for (code, ch) in FIXED {
            self.slots
                .insert(KeyCode(code), KeySlot::uniform(KeyOutput::Char(ch)));
        }
        for code in MORE_FUNCTION_KEYS {
            self.slots
                .insert(KeyCode(code), KeySlot::uniform(KeyOutput::Char(FUNCTION_KEY)));
        }
        self.slots.insert(
            KeyCode(0x31),
            KeySlot::new(
                KeyOutput::Char(' '),
                KeyOutput::Char(' '),
                KeyOutput::Char('\u{a0}'),
                KeyOutput::Char('\u{a0}'),
            ),
        );
        self
    }

    pub fn build(self) -> LayoutTable {
        LayoutTable {
            id: self.id,
            slots: self.slots,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{to_native_flags, ModifierSet};

    fn translate(table: &LayoutTable, code: u16, modifiers: ModifierSet) -> Option<String> {
        let mut state = DeadKeyState::new();
        table
            .translate(
                KeyCode(code),
                to_native_flags(modifiers),
                &mut state,
                DeadKeyMode::Compose,
            )
            .text
    }

    #[test]
    fn test_builder_minimal_table() {
        let table = LayoutTable::builder("test.minimal").key(9, 'v', 'V').build();
        assert_eq!(table.id(), "test.minimal");
        assert_eq!(table.len(), 1);
        assert_eq!(translate(&table, 9, ModifierSet::empty()).as_deref(), Some("v"));
        assert_eq!(translate(&table, 9, ModifierSet::SHIFT).as_deref(), Some("V"));
        assert_eq!(translate(&table, 9, ModifierSet::OPTION), None);
        assert_eq!(translate(&table, 0x5d, ModifierSet::empty()), None);
    }

    #[test]
    fn test_caps_lock_upper_cases_letters_only() {
        let table = abc();
        assert_eq!(translate(&table, 9, ModifierSet::CAPS_LOCK).as_deref(), Some("V"));
        assert_eq!(translate(&table, 0x12, ModifierSet::CAPS_LOCK).as_deref(), Some("1"));
    }

    #[test]
    fn test_control_produces_control_characters() {
        let table = abc();
        assert_eq!(translate(&table, 9, ModifierSet::CONTROL).as_deref(), Some("\u{16}"));
    }

    #[test]
    fn test_command_is_ignored() {
        let table = abc();
        assert_eq!(translate(&table, 9, ModifierSet::COMMAND).as_deref(), Some("v"));
    }

    #[test]
    fn test_standard_keys() {
        let table = abc();
        assert_eq!(translate(&table, 0x24, ModifierSet::empty()).as_deref(), Some("\r"));
        assert_eq!(translate(&table, 0x53, ModifierSet::SHIFT).as_deref(), Some("1"));
        assert_eq!(translate(&table, 0x31, ModifierSet::OPTION).as_deref(), Some("\u{a0}"));
        // Modifier keys type nothing
        assert_eq!(translate(&table, 0x38, ModifierSet::empty()), None);
    }

    #[test]
    fn test_dead_key_composition() {
        let table = abc();
        let mut state = DeadKeyState::new();
        let option = to_native_flags(ModifierSet::OPTION);

        let first = table.translate(KeyCode(0x0e), option, &mut state, DeadKeyMode::Compose);
        assert_eq!(first, Translation::dead_key_start());
        assert!(state.is_pending());

        let second = table.translate(
            KeyCode(0x0e),
            NativeModifiers::empty(),
            &mut state,
            DeadKeyMode::Compose,
        );
        assert_eq!(second.text.as_deref(), Some("é"));
        assert!(!state.is_pending());
    }

    #[test]
    fn test_dead_key_suppressed() {
        let table = abc();
        let mut state = DeadKeyState::new();
        let option = to_native_flags(ModifierSet::OPTION);
        let out = table.translate(KeyCode(0x0e), option, &mut state, DeadKeyMode::Suppress);
        assert_eq!(out.text.as_deref(), Some("´"));
        assert!(!state.is_pending());
    }

    #[test]
    fn test_second_dead_key_replaces_pending() {
        let table = abc();
        let mut state = DeadKeyState::new();
        let option = to_native_flags(ModifierSet::OPTION);
        table.translate(KeyCode(0x0e), option, &mut state, DeadKeyMode::Compose);
        table.translate(KeyCode(0x20), option, &mut state, DeadKeyMode::Compose);
        let out = table.translate(
            KeyCode(0x00),
            NativeModifiers::empty(),
            &mut state,
            DeadKeyMode::Compose,
        );
        assert_eq!(out.text.as_deref(), Some("ä"));
    }

    #[test]
    fn test_unknown_code_clears_pending_dead_key() {
        let table = abc();
        let mut state = DeadKeyState::new();
        let option = to_native_flags(ModifierSet::OPTION);
        table.translate(KeyCode(0x0e), option, &mut state, DeadKeyMode::Compose);
        let out = table.translate(
            KeyCode(0x5d),
            NativeModifiers::empty(),
            &mut state,
            DeadKeyMode::Compose,
        );
        assert_eq!(out, Translation::empty());
        assert!(!state.is_pending());
    }

    #[test]
    fn test_code_for_base() {
        let table = abc();
        assert_eq!(table.code_for_base('v'), Some(KeyCode(9)));
        assert_eq!(table.code_for_base('√'), None);
    }
}
