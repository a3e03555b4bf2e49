// Keylayout Core Library
// Layout-aware translation between logical keys, physical key codes and characters

pub mod engine;
pub mod key;
pub mod layouts;
pub mod modifier;
pub mod platform;
pub mod snapshot;
pub mod source;

#[cfg(feature = "settings")]
pub mod settings;

pub use engine::{KeyboardLayout, LayoutError, LayoutEvent, ListenerId, TranslationOptions};
pub use key::{KeyCode, LogicalKey};
pub use layouts::{DeadKeyKind, KeyOutput, KeySlot, LayoutTable, LayoutTableBuilder};
pub use modifier::{from_native_flags, to_native_flags, ModifierError, ModifierSet, NativeModifiers};
pub use platform::{
    DeadKeyMode, DeadKeyState, KeyboardPlatform, MemoryPlatform, NotificationCallback,
    PlatformError, PlatformNotification, SubscriptionId, Translation,
};
pub use snapshot::{LayoutSnapshot, TranslationEntry};
pub use source::{InputSource, InputSourceId, InputSourceKind};

#[cfg(feature = "settings")]
pub use settings::{Settings, SettingsError};
