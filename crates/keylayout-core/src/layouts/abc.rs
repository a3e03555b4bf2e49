// ABC / U.S. key layout data (ANSI and ISO positions)

use super::{DeadKeyKind, KeyOutput, KeySlot, LayoutTable};

const fn c(ch: char) -> KeyOutput {
    KeyOutput::Char(ch)
}

const fn dead(kind: DeadKeyKind) -> KeyOutput {
    KeyOutput::Dead(kind)
}

const fn row(base: char, shift: char, option: KeyOutput, shift_option: char) -> KeySlot {
    KeySlot::new(c(base), c(shift), option, c(shift_option))
}

/// (code, layers) for every character key, base / shift / option / shift+option
const ABC_KEYS: [(u16, KeySlot); 49] = [
    (0x00, row('a', 'A', c('å'), 'Å')),
    (0x01, row('s', 'S', c('ß'), 'Í')),
    (0x02, row('d', 'D', c('∂'), 'Î')),
    (0x03, row('f', 'F', c('ƒ'), 'Ï')),
    (0x04, row('h', 'H', c('˙'), 'Ó')),
    (0x05, row('g', 'G', c('©'), '˝')),
    (0x06, row('z', 'Z', c('Ω'), '¸')),
    (0x07, row('x', 'X', c('≈'), '˛')),
    (0x08, row('c', 'C', c('ç'), 'Ç')),
    (0x09, row('v', 'V', c('√'), '◊')),
    (0x0a, row('§', '±', c('§'), '±')),
    (0x0b, row('b', 'B', c('∫'), 'ı')),
    (0x0c, row('q', 'Q', c('œ'), 'Œ')),
    (0x0d, row('w', 'W', c('∑'), '„')),
    (0x0e, row('e', 'E', dead(DeadKeyKind::Acute), '´')),
    (0x0f, row('r', 'R', c('®'), '‰')),
    (0x10, row('y', 'Y', c('¥'), 'Á')),
    (0x11, row('t', 'T', c('†'), 'ˇ')),
    (0x12, row('1', '!', c('¡'), '⁄')),
    (0x13, row('2', '@', c('™'), '€')),
    (0x14, row('3', '#', c('£'), '‹')),
    (0x15, row('4', '$', c('¢'), '›')),
    (0x16, row('6', '^', c('§'), 'ﬂ')),
    (0x17, row('5', '%', c('∞'), 'ﬁ')),
    (0x18, row('=', '+', c('≠'), '±')),
    (0x19, row('9', '(', c('ª'), '·')),
    (0x1a, row('7', '&', c('¶'), '‡')),
    (0x1b, row('-', '_', c('–'), '—')),
    (0x1c, row('8', '*', c('•'), '°')),
    (0x1d, row('0', ')', c('º'), '‚')),
    (0x1e, row(']', '}', c('‘'), '’')),
    (0x1f, row('o', 'O', c('ø'), 'Ø')),
    (0x20, row('u', 'U', dead(DeadKeyKind::Umlaut), '¨')),
    (0x21, row('[', '{', c('“'), '”')),
    (0x22, row('i', 'I', dead(DeadKeyKind::Circumflex), 'ˆ')),
    (0x23, row('p', 'P', c('π'), '∏')),
    (0x25, row('l', 'L', c('¬'), 'Ò')),
    (0x26, row('j', 'J', c('∆'), 'Ô')),
    (0x27, row('\'', '"', c('æ'), 'Æ')),
    (0x28, row('k', 'K', c('˚'), '\u{f8ff}')),
    (0x29, row(';', ':', c('…'), 'Ú')),
    (0x2a, row('\\', '|', c('«'), '»')),
    (0x2b, row(',', '<', c('≤'), '¯')),
    (0x2c, row('/', '?', c('÷'), '¿')),
    (0x2d, row('n', 'N', dead(DeadKeyKind::Tilde), '˜')),
    (0x2e, row('m', 'M', c('µ'), 'Â')),
    (0x2f, row('.', '>', c('≥'), '˘')),
    (0x32, row('`', '~', dead(DeadKeyKind::Grave), '`')),
    (0x31, KeySlot::uniform(c(' '))),
];

fn build(id: &str) -> LayoutTable {
    let builder = ABC_KEYS
        .iter()
        .fold(LayoutTable::builder(id), |builder, (code, slot)| {
            builder.slot(*code, *slot)
        });
    // Standard keys come last so space gets its option layer
    builder.standard_keys().build()
}

/// The ABC layout (`com.apple.keylayout.ABC`)
pub fn abc() -> LayoutTable {
    build("com.apple.keylayout.ABC")
}

/// The U.S. layout (`com.apple.keylayout.US`), positionally identical to ABC
pub fn us() -> LayoutTable {
    build("com.apple.keylayout.US")
}
