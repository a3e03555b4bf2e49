use crate::platform::DeadKeyState;

/// Accent carried by a dead key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeadKeyKind {
    Acute,
    Grave,
    Circumflex,
    Tilde,
    Umlaut,
}

impl DeadKeyKind {
    const ALL: [DeadKeyKind; 5] = [
        Self::Acute,
        Self::Grave,
        Self::Circumflex,
        Self::Tilde,
        Self::Umlaut,
    ];

    /// Character typed when the accent stands alone
    pub fn standalone(self) -> char {
        match self {
            Self::Acute => '\u{00B4}',      // ´
            Self::Grave => '`',
            Self::Circumflex => '\u{02C6}', // ˆ
            Self::Tilde => '\u{02DC}',      // ˜
            Self::Umlaut => '\u{00A8}',     // ¨
        }
    }

    /// Encode as pending composition state (never zero)
    pub fn to_state(self) -> DeadKeyState {
        let index = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        DeadKeyState::from_raw(index as u32 + 1)
    }

    /// Decode a pending composition state written by [`DeadKeyKind::to_state`]
    pub fn from_state(state: DeadKeyState) -> Option<Self> {
        let raw = state.raw();
        if raw == 0 {
            return None;
        }
        Self::ALL.get(raw as usize - 1).copied()
    }

    /// Text produced when `next` follows this dead key.
    ///
    /// Compatible letters compose, space commits the accent alone, and any
    /// other character is kept after the standalone accent.
    pub fn resolve(self, next: char) -> String {
        if let Some(composed) = compose_letter(self, next) {
            return composed.to_string();
        }
        if next == ' ' {
            return self.standalone().to_string();
        }
        let mut text = String::with_capacity(8);
        text.push(self.standalone());
        text.push(next);
        text
    }
}

fn compose_letter(kind: DeadKeyKind, base: char) -> Option<char> {
    let out = match kind {
        DeadKeyKind::Acute => match base {
            'a' => 'á',
            'e' => 'é',
            'i' => 'í',
            'o' => 'ó',
            'u' => 'ú',
            'y' => 'ý',
            'A' => 'Á',
            'E' => 'É',
            'I' => 'Í',
            'O' => 'Ó',
            'U' => 'Ú',
            'Y' => 'Ý',
            _ => return None,
        },
        DeadKeyKind::Grave => match base {
            'a' => 'à',
            'e' => 'è',
            'i' => 'ì',
            'o' => 'ò',
            'u' => 'ù',
            'A' => 'À',
            'E' => 'È',
            'I' => 'Ì',
            'O' => 'Ò',
            'U' => 'Ù',
            _ => return None,
        },
        DeadKeyKind::Tilde => match base {
            'a' => 'ã',
            'n' => 'ñ',
            'o' => 'õ',
            'A' => 'Ã',
            'N' => 'Ñ',
            'O' => 'Õ',
            _ => return None,
        },
        DeadKeyKind::Umlaut => match base {
            'a' => 'ä',
            'e' => 'ë',
            'i' => 'ï',
            'o' => 'ö',
            'u' => 'ü',
            'y' => 'ÿ',
            'A' => 'Ä',
            'E' => 'Ë',
            'I' => 'Ï',
            'O' => 'Ö',
            'U' => 'Ü',
            'Y' => 'Ÿ',
            _ => return None,
        },
        DeadKeyKind::Circumflex => match base {
            'a' => 'â',
            'e' => 'ê',
            'i' => 'î',
            'o' => 'ô',
            'u' => 'û',
            'A' => 'Â',
            'E' => 'Ê',
            'I' => 'Î',
            'O' => 'Ô',
            'U' => 'Û',
            _ => return None,
        },
    };

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for kind in DeadKeyKind::ALL {
            let state = kind.to_state();
            assert!(state.is_pending());
            assert_eq!(DeadKeyKind::from_state(state), Some(kind));
        }
        assert_eq!(DeadKeyKind::from_state(DeadKeyState::new()), None);
        assert_eq!(DeadKeyKind::from_state(DeadKeyState::from_raw(99)), None);
    }

    #[test]
    fn test_compose_acute_lowercase() {
        assert_eq!(DeadKeyKind::Acute.resolve('e'), "é");
    }

    #[test]
    fn test_compose_tilde_uppercase() {
        assert_eq!(DeadKeyKind::Tilde.resolve('N'), "Ñ");
    }

    #[test]
    fn test_space_commits_standalone_accent() {
        assert_eq!(DeadKeyKind::Umlaut.resolve(' '), "¨");
        assert_eq!(DeadKeyKind::Grave.resolve(' '), "`");
    }

    #[test]
    fn test_incompatible_key_keeps_both_characters() {
        assert_eq!(DeadKeyKind::Acute.resolve('x'), "´x");
        assert_eq!(DeadKeyKind::Circumflex.resolve('1'), "ˆ1");
    }
}
