// Keylayout Input Source Reference
// Identity and platform handle of one keyboard input source

use std::borrow::Borrow;
use std::fmt;

/// Reverse-DNS identifier of an input source, e.g. `com.apple.keylayout.ABC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputSourceId(String);

impl InputSourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for InputSourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for InputSourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl Borrow<str> for InputSourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InputSourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What kind of input source the platform reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputSourceKind {
    /// A plain keyboard layout (ABC, Dvorak, ...)
    #[default]
    KeyboardLayout,
    /// An input method without modes, or the parent of a moded one
    InputMethod,
    /// One mode of an input method (e.g. Kotoeri Japanese)
    InputMode,
    /// Palettes, ink and anything else
    Other,
}

/// A captured input source: its identity plus the handle the platform needs
/// to translate against it.
///
/// Two sources are equal when their identifiers are equal.
#[derive(Debug, Clone)]
pub struct InputSource<H> {
    id: InputSourceId,
    localized_name: Option<String>,
    kind: InputSourceKind,
    ascii_capable: bool,
    handle: H,
}

impl<H> InputSource<H> {
    /// Create a keyboard-layout source with the given handle
    pub fn new(id: impl Into<InputSourceId>, handle: H) -> Self {
        Self {
            id: id.into(),
            localized_name: None,
            kind: InputSourceKind::KeyboardLayout,
            ascii_capable: true,
            handle,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.localized_name = Some(name.into());
        self
    }

    pub fn with_kind(mut self, kind: InputSourceKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_ascii_capable(mut self, ascii_capable: bool) -> Self {
        self.ascii_capable = ascii_capable;
        self
    }

    pub fn id(&self) -> &InputSourceId {
        &self.id
    }

    pub fn localized_name(&self) -> Option<&str> {
        self.localized_name.as_deref()
    }

    pub fn kind(&self) -> InputSourceKind {
        self.kind
    }

    pub fn is_ascii_capable(&self) -> bool {
        self.ascii_capable
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Whether `other` names the same input source
    pub fn same_identity<O>(&self, other: &InputSource<O>) -> bool {
        self.id == other.id
    }
}

impl<H> PartialEq for InputSource<H> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<H> Eq for InputSource<H> {}

impl<H> fmt::Display for InputSource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.localized_name {
            Some(name) => write!(f, "{} ({})", name, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_source_defaults() {
        let source = InputSource::new("com.apple.keylayout.ABC", ());
        assert_eq!(source.id().as_str(), "com.apple.keylayout.ABC");
        assert_eq!(source.kind(), InputSourceKind::KeyboardLayout);
        assert!(source.is_ascii_capable());
        assert_eq!(source.localized_name(), None);
    }

    #[test]
    fn test_input_source_equality_is_by_id() {
        let a = InputSource::new("com.apple.keylayout.ABC", 1u8).with_name("ABC");
        let b = InputSource::new("com.apple.keylayout.ABC", 2u8);
        let c = InputSource::new("com.apple.keylayout.Dvorak", 1u8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.same_identity(&InputSource::new("com.apple.keylayout.ABC", ())));
    }

    #[test]
    fn test_input_source_display() {
        let source = InputSource::new("com.apple.keylayout.Dvorak", ()).with_name("Dvorak");
        assert_eq!(source.to_string(), "Dvorak (com.apple.keylayout.Dvorak)");
        assert_eq!(InputSourceId::from("x.y").to_string(), "x.y");
    }

    #[test]
    fn test_input_source_builder() {
        let source = InputSource::new("com.apple.inputmethod.Kotoeri.Japanese", ())
            .with_kind(InputSourceKind::InputMode)
            .with_ascii_capable(false);
        assert_eq!(source.kind(), InputSourceKind::InputMode);
        assert!(!source.is_ascii_capable());
    }
}
