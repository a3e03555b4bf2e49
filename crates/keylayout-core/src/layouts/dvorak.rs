// Dvorak key layout data
// Derived from ABC by moving each character key to its Dvorak position

use super::{abc, LayoutTable};

/// (code, Dvorak base character) for each key that differs from ABC
const DVORAK_POSITIONS: [(u16, char); 33] = [
    // number row
    (0x1b, '['),
    (0x18, ']'),
    // top row
    (0x0c, '\''),
    (0x0d, ','),
    (0x0e, '.'),
    (0x0f, 'p'),
    (0x11, 'y'),
    (0x10, 'f'),
    (0x20, 'g'),
    (0x22, 'c'),
    (0x1f, 'r'),
    (0x23, 'l'),
    (0x21, '/'),
    (0x1e, '='),
    // home row
    (0x01, 'o'),
    (0x02, 'e'),
    (0x03, 'u'),
    (0x05, 'i'),
    (0x04, 'd'),
    (0x26, 'h'),
    (0x28, 't'),
    (0x25, 'n'),
    (0x29, 's'),
    (0x27, '-'),
    // bottom row
    (0x06, ';'),
    (0x07, 'q'),
    (0x08, 'j'),
    (0x09, 'k'),
    (0x0b, 'x'),
    (0x2d, 'b'),
    (0x2b, 'w'),
    (0x2f, 'v'),
    (0x2c, 'z'),
];

/// The Dvorak layout (`com.apple.keylayout.Dvorak`)
pub fn dvorak() -> LayoutTable {
    let qwerty = abc();
    let mut builder = LayoutTable::builder("com.apple.keylayout.Dvorak").extend_from(&qwerty);
    for (code, ch) in DVORAK_POSITIONS {
        let Some(slot) = qwerty.code_for_base(ch).and_then(|from| qwerty.slot(from)) else {
            continue;
        };
        builder = builder.slot(code, *slot);
    }
    builder.build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layouts::KeyOutput;
    use crate::KeyCode;

    fn base(table: &LayoutTable, code: u16) -> Option<KeyOutput> {
        table.slot(KeyCode(code)).map(|slot| slot.base)
    }

    #[test]
    fn test_dvorak_v_moves_to_period_position() {
        let table = dvorak();
        assert_eq!(base(&table, 0x2f), Some(KeyOutput::Char('v')));
        assert_eq!(base(&table, 0x09), Some(KeyOutput::Char('k')));
        assert_eq!(table.code_for_base('v'), Some(KeyCode(47)));
    }

    #[test]
    fn test_dvorak_keeps_option_layers_with_character() {
        let table = dvorak();
        let slot = table.slot(KeyCode(47)).copied();
        assert_eq!(slot.map(|s| s.option), Some(KeyOutput::Char('√')));
        assert_eq!(slot.map(|s| s.shift_option), Some(KeyOutput::Char('◊')));
    }

    #[test]
    fn test_dvorak_unmoved_keys() {
        let table = dvorak();
        assert_eq!(base(&table, 0x00), Some(KeyOutput::Char('a')));
        assert_eq!(base(&table, 0x2e), Some(KeyOutput::Char('m')));
        assert_eq!(base(&table, 0x12), Some(KeyOutput::Char('1')));
    }

    #[test]
    fn test_dvorak_base_characters_stay_unique() {
        let table = dvorak();
        for ch in ['a', 'v', 'k', '-', '[', '\'', 'z'] {
            let code = table.code_for_base(ch);
            assert!(code.is_some(), "{:?} missing", ch);
        }
        assert_eq!(table.len(), abc().len());
    }
}
