// Keylayout Layout Snapshot
// Immutable key tables for one input source plus its lazily filled character cache

use std::collections::HashMap;

use log::{debug, trace, warn};
use parking_lot::RwLock;

use crate::engine::TranslationOptions;
use crate::platform::{DeadKeyMode, DeadKeyState, KeyboardPlatform, PlatformError, Translation};
use crate::{to_native_flags, InputSource, InputSourceId, KeyCode, LogicalKey, NativeModifiers};

/// Cached outcome of translating one (code, modifiers) pair with nothing pending.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TranslationEntry {
    /// Produced text; `None` for keys that type nothing
    pub text: Option<String>,
    /// The key starts a dead-key composition
    pub dead_key_start: bool,
}

impl From<&Translation> for TranslationEntry {
    fn from(translation: &Translation) -> Self {
        Self {
            text: translation.text.clone(),
            dead_key_start: translation.dead_key_start,
        }
    }
}

/// Translation tables for one input source.
///
/// The key maps are fixed when the snapshot is built. Only the character
/// cache grows afterwards, and only with results that did not depend on a
/// pending dead key.
#[derive(Debug)]
pub struct LayoutSnapshot {
    source_id: InputSourceId,
    keys: HashMap<KeyCode, LogicalKey>,
    key_codes: HashMap<LogicalKey, KeyCode>,
    characters: RwLock<HashMap<(KeyCode, NativeModifiers), TranslationEntry>>,
}

impl LayoutSnapshot {
    /// Scan every code up to `options.max_key_code` with no modifiers held.
    ///
    /// Codes the platform fails to translate are left unmapped. Fails only
    /// when `source` has no layout data to translate with.
    pub fn build<P: KeyboardPlatform>(
        platform: &P,
        source: &InputSource<P::Handle>,
        options: &TranslationOptions,
    ) -> Result<Self, PlatformError> {
        let mut keys = HashMap::new();
        let mut key_codes: HashMap<LogicalKey, KeyCode> = HashMap::new();

        for raw in 0..=options.max_key_code {
            let code = KeyCode(raw);
            let mut state = DeadKeyState::new();
            let translation = match platform.translate(
                source,
                code,
                NativeModifiers::empty(),
                &mut state,
                DeadKeyMode::Suppress,
            ) {
                Ok(translation) => translation,
                Err(err @ PlatformError::MissingLayoutData(_)) => return Err(err),
                Err(err) => {
                    warn!("Skipping {} while scanning {}: {}", code, source.id(), err);
                    continue;
                }
            };
            let text = translation.text.as_deref().unwrap_or("");
            if let Some(key) = LogicalKey::from_character(text, code) {
                keys.insert(code, key);
                // Ascending scan: the first code seen is the lowest
                key_codes.entry(key).or_insert(code);
            }
        }

        // The reference position wins whenever it still produces the key
        for (key, code) in key_codes.iter_mut() {
            let reference = key.reference_key_code();
            if keys.get(&reference) == Some(key) {
                *code = reference;
            }
        }

        let snapshot = Self {
            source_id: source.id().clone(),
            keys,
            key_codes,
            characters: RwLock::new(HashMap::new()),
        };

        let mode = options.dead_key_mode();
        for modifiers in &options.prewarm {
            let native = to_native_flags(*modifiers);
            for raw in 0..=options.max_key_code {
                let mut state = DeadKeyState::new();
                match platform.translate(source, KeyCode(raw), native, &mut state, mode) {
                    Ok(translation) => {
                        snapshot.store(KeyCode(raw), native, TranslationEntry::from(&translation))
                    }
                    Err(err) => trace!("Not prewarming {}: {}", KeyCode(raw), err),
                }
            }
            trace!("Prewarmed {} for {}", modifiers, snapshot.source_id);
        }

        debug!(
            "Built layout snapshot for {}: {} keys mapped",
            snapshot.source_id,
            snapshot.keys.len()
        );
        Ok(snapshot)
    }

    pub fn source_id(&self) -> &InputSourceId {
        &self.source_id
    }

    /// Code producing `key` under this layout
    pub fn key_code(&self, key: LogicalKey) -> Option<KeyCode> {
        self.key_codes.get(&key).copied()
    }

    /// Logical key produced by `code` with no modifiers
    pub fn key(&self, code: KeyCode) -> Option<LogicalKey> {
        self.keys.get(&code).copied()
    }

    pub fn mapped_keys(&self) -> usize {
        self.keys.len()
    }

    /// Whether both snapshots place every logical key at the same code
    pub fn same_key_codes(&self, other: &LayoutSnapshot) -> bool {
        self.key_codes == other.key_codes
    }

    pub fn cached(&self, code: KeyCode, modifiers: NativeModifiers) -> Option<TranslationEntry> {
        self.characters.read().get(&(code, modifiers)).cloned()
    }

    pub fn store(&self, code: KeyCode, modifiers: NativeModifiers, entry: TranslationEntry) {
        self.characters.write().insert((code, modifiers), entry);
    }

    pub fn cached_entries(&self) -> usize {
        self.characters.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::{ABC_ID, DVORAK_ID, KOTOERI_ID};
    use crate::{MemoryPlatform, ModifierSet};

    fn snapshot(platform: &MemoryPlatform, id: &str, options: &TranslationOptions) -> LayoutSnapshot {
        let source = platform.source(id).unwrap();
        LayoutSnapshot::build(platform, &source, options).unwrap()
    }

    #[test]
    fn test_abc_snapshot_maps_letters() {
        let platform = MemoryPlatform::new();
        let snap = snapshot(&platform, ABC_ID, &TranslationOptions::default());
        assert_eq!(snap.source_id().as_str(), ABC_ID);
        assert_eq!(snap.key_code(LogicalKey::V), Some(KeyCode(9)));
        assert_eq!(snap.key(KeyCode(9)), Some(LogicalKey::V));
        assert_eq!(snap.key(KeyCode(0x38)), Some(LogicalKey::Shift));
        assert_eq!(snap.key_code(LogicalKey::Yen), None);
        assert_eq!(snap.cached_entries(), 0);
    }

    #[test]
    fn test_dvorak_snapshot_differs_from_abc() {
        let platform = MemoryPlatform::new();
        let options = TranslationOptions::default();
        let abc = snapshot(&platform, ABC_ID, &options);
        let dvorak = snapshot(&platform, DVORAK_ID, &options);
        assert_eq!(dvorak.key_code(LogicalKey::V), Some(KeyCode(47)));
        assert_eq!(dvorak.key(KeyCode(9)), Some(LogicalKey::K));
        assert!(!abc.same_key_codes(&dvorak));
        assert!(abc.same_key_codes(&snapshot(&platform, ABC_ID, &options)));
    }

    #[test]
    fn test_dead_keys_are_indexed_by_scan() {
        use crate::layouts::{DeadKeyKind, KeyOutput, KeySlot, LayoutTable};

        let platform = MemoryPlatform::empty();
        let table = LayoutTable::builder("test.deadbase")
            .slot(0x0e, KeySlot::uniform(KeyOutput::Dead(DeadKeyKind::Grave)))
            .key(0x00, 'a', 'A')
            .build();
        let source = platform.add_layout(table, "Dead base");
        let snap = LayoutSnapshot::build(&platform, &source, &TranslationOptions::default()).unwrap();
        assert_eq!(snap.key(KeyCode(0x0e)), Some(LogicalKey::Grave));
        assert_eq!(snap.key_code(LogicalKey::A), Some(KeyCode(0)));
    }

    #[test]
    fn test_prewarm_fills_character_cache() {
        let platform = MemoryPlatform::new();
        let options = TranslationOptions {
            max_key_code: 0x0f,
            prewarm: vec![ModifierSet::OPTION],
            ..TranslationOptions::default()
        };
        let snap = snapshot(&platform, ABC_ID, &options);
        assert_eq!(snap.cached_entries(), 16);
        let option = to_native_flags(ModifierSet::OPTION);
        assert_eq!(
            snap.cached(KeyCode(9), option).and_then(|e| e.text),
            Some("√".to_string())
        );
        let dead = snap.cached(KeyCode(0x0e), option).unwrap();
        assert!(dead.dead_key_start);
        assert_eq!(dead.text, None);
    }

    #[test]
    fn test_build_fails_without_layout_data() {
        let platform = MemoryPlatform::new();
        let source = platform.source(KOTOERI_ID).unwrap();
        let result = LayoutSnapshot::build(&platform, &source, &TranslationOptions::default());
        assert!(matches!(result, Err(PlatformError::MissingLayoutData(_))));
    }
}
