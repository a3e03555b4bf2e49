// Keylayout Integration Tests
//
// Translation against the built-in ABC, Dvorak and Kotoeri sources of the
// in-memory platform.

use keylayout_core::platform::memory::{ABC_ID, DVORAK_ID, KOTOERI_ID, KOTOERI_JAPANESE_ID};
use keylayout_core::{
    KeyCode, KeyboardLayout, KeyboardPlatform, LogicalKey, MemoryPlatform, ModifierSet,
    NativeModifiers,
};
use strum::IntoEnumIterator;

const QWERTY_V: KeyCode = KeyCode(9);
const DVORAK_V: KeyCode = KeyCode(47);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn assert_v_characters(layout: &mut KeyboardLayout<MemoryPlatform>, code: KeyCode) {
    assert_eq!(layout.current_character(code, ModifierSet::empty()).as_deref(), Some("v"));
    assert_eq!(layout.current_character(code, ModifierSet::SHIFT).as_deref(), Some("V"));
    assert_eq!(layout.current_character(code, ModifierSet::OPTION).as_deref(), Some("√"));
    assert_eq!(
        layout
            .current_character(code, ModifierSet::SHIFT | ModifierSet::OPTION)
            .as_deref(),
        Some("◊")
    );
}

#[test]
fn test_key_codes_for_abc_keyboard() {
    init_logging();
    let platform = MemoryPlatform::new();
    platform.activate(ABC_ID).unwrap();
    let mut layout = KeyboardLayout::new(platform).unwrap();

    assert_eq!(layout.current_key_code(LogicalKey::V), Some(QWERTY_V));
    assert_eq!(layout.current_key(QWERTY_V), Some(LogicalKey::V));
    assert_v_characters(&mut layout, QWERTY_V);
}

#[test]
fn test_key_codes_for_dvorak_keyboard() {
    init_logging();
    let platform = MemoryPlatform::new();
    platform.activate(DVORAK_ID).unwrap();
    let mut layout = KeyboardLayout::new(platform).unwrap();

    assert_eq!(layout.current_key_code(LogicalKey::V), Some(DVORAK_V));
    assert_eq!(layout.current_key(DVORAK_V), Some(LogicalKey::V));
    assert_v_characters(&mut layout, DVORAK_V);
}

#[test]
fn test_key_codes_japanese_and_dvorak_only_keyboard() {
    init_logging();
    let platform = MemoryPlatform::new();
    platform.activate(DVORAK_ID).unwrap();
    let kotoeri = platform.source(KOTOERI_ID).unwrap();
    platform.enable(&kotoeri).unwrap();
    platform.activate(KOTOERI_JAPANESE_ID).unwrap();
    let abc = platform.source(ABC_ID).unwrap();
    platform.disable(&abc).unwrap();

    let enabled: Vec<String> = platform
        .input_sources(false)
        .unwrap()
        .iter()
        .map(|source| source.id().to_string())
        .collect();
    assert_eq!(enabled, vec![DVORAK_ID, KOTOERI_ID, KOTOERI_JAPANESE_ID]);

    let mut layout = KeyboardLayout::new(platform).unwrap();
    assert_eq!(layout.current_input_source().id().as_str(), ABC_ID);
    assert_eq!(layout.current_key_code(LogicalKey::V), Some(QWERTY_V));
    assert_eq!(layout.current_key(QWERTY_V), Some(LogicalKey::V));
    assert_v_characters(&mut layout, QWERTY_V);
}

#[test]
fn test_round_trip_for_every_positioned_key() {
    init_logging();
    for id in [ABC_ID, DVORAK_ID] {
        let platform = MemoryPlatform::new();
        platform.activate(id).unwrap();
        let layout = KeyboardLayout::new(platform).unwrap();

        let mut positioned = 0;
        for key in LogicalKey::iter() {
            if let Some(code) = layout.current_key_code(key) {
                positioned += 1;
                assert_eq!(layout.current_key(code), Some(key), "{} on {}", key, id);
            }
        }
        assert!(positioned > 100, "only {} keys positioned on {}", positioned, id);
    }
}

#[test]
fn test_every_letter_has_a_position() {
    let layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();
    for key in LogicalKey::iter().filter(|key| key.canonical_character().is_some_and(|c| c.is_ascii_lowercase())) {
        assert!(layout.current_key_code(key).is_some(), "{} has no code", key);
    }
}

#[test]
fn test_unknown_codes_produce_nothing() {
    init_logging();
    let mut layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();

    // ABC has no JIS yen key
    assert_eq!(layout.current_character(KeyCode(0x5d), ModifierSet::empty()), None);
    assert_eq!(layout.current_key(KeyCode(0x5d)), None);
    assert_eq!(layout.current_key_code(LogicalKey::Yen), None);
    assert_eq!(layout.current_character(KeyCode(0x1ff), ModifierSet::SHIFT), None);
    // Modifier keys are positioned but type nothing
    assert_eq!(layout.current_key(KeyCode(0x3a)), Some(LogicalKey::Option));
    assert_eq!(layout.current_character(KeyCode(0x3a), ModifierSet::empty()), None);
}

#[test]
fn test_position_fixed_keys() {
    let layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();
    assert_eq!(layout.current_key_code(LogicalKey::Keypad1), Some(KeyCode(0x53)));
    assert_eq!(layout.current_key(KeyCode(0x53)), Some(LogicalKey::Keypad1));
    assert_eq!(layout.current_key_code(LogicalKey::One), Some(KeyCode(0x12)));
    assert_eq!(layout.current_key_code(LogicalKey::Return), Some(KeyCode(0x24)));
    assert_eq!(layout.current_key_code(LogicalKey::F1), Some(KeyCode(0x7a)));
}

#[test]
fn test_dead_key_composes_with_compatible_letter() {
    init_logging();
    let mut layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();

    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::OPTION), None);
    assert!(layout.has_pending_dead_key());
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::empty()).as_deref(), Some("é"));
    assert!(!layout.has_pending_dead_key());

    // Umlaut over shifted u
    assert_eq!(layout.current_character(KeyCode(0x20), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x20), ModifierSet::SHIFT).as_deref(), Some("Ü"));

    // Nothing left pending
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::empty()).as_deref(), Some("e"));
}

#[test]
fn test_dead_key_with_incompatible_key_keeps_both() {
    let mut layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();

    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x07), ModifierSet::empty()).as_deref(), Some("´x"));

    assert_eq!(layout.current_character(KeyCode(0x2d), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x31), ModifierSet::empty()).as_deref(), Some("˜"));
}

#[test]
fn test_second_dead_key_replaces_pending() {
    let mut layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();

    assert_eq!(layout.current_character(KeyCode(0x20), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x32), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x00), ModifierSet::empty()).as_deref(), Some("à"));
}

#[test]
fn test_dead_key_results_are_not_served_from_cache() {
    let platform = MemoryPlatform::new();
    let mut layout = KeyboardLayout::new(platform.clone()).unwrap();

    // Cache the plain 'e' first
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::empty()).as_deref(), Some("e"));
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::OPTION), None);
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::empty()).as_deref(), Some("é"));

    // The dead key itself is retranslated each time
    let calls = platform.translate_calls();
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::OPTION), None);
    assert!(platform.translate_calls() > calls);
    layout.clear_dead_key();
    assert!(!layout.has_pending_dead_key());
    assert_eq!(layout.current_character(KeyCode(0x0e), ModifierSet::empty()).as_deref(), Some("e"));
}

#[test]
fn test_native_modifiers_entry_point() {
    let mut layout = KeyboardLayout::new(MemoryPlatform::new()).unwrap();
    let right_option = NativeModifiers::RIGHT_OPTION | NativeModifiers::OPTION;
    assert_eq!(layout.current_character_native(QWERTY_V, right_option).as_deref(), Some("√"));
    assert_eq!(
        layout
            .current_character_native(QWERTY_V, NativeModifiers::ALPHA_LOCK)
            .as_deref(),
        Some("V")
    );
    assert_eq!(
        layout
            .current_character(QWERTY_V, ModifierSet::COMMAND | ModifierSet::SHIFT)
            .as_deref(),
        Some("V")
    );
}
