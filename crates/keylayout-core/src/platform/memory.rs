//! In-memory keyboard platform
//!
//! A self-contained input-source registry with table-driven translation.
//! It backs the engine on hosts without a native backend and in tests.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use log::{debug, trace};
use parking_lot::RwLock;
use smallvec::SmallVec;

use super::{
    DeadKeyMode, DeadKeyState, KeyboardPlatform, NotificationCallback, PlatformError,
    PlatformNotification, SubscriptionId, Translation,
};
use crate::layouts::{self, LayoutTable};
use crate::{InputSource, InputSourceId, InputSourceKind, KeyCode, NativeModifiers};

pub const ABC_ID: &str = "com.apple.keylayout.ABC";
pub const US_ID: &str = "com.apple.keylayout.US";
pub const DVORAK_ID: &str = "com.apple.keylayout.Dvorak";
pub const KOTOERI_ID: &str = "com.apple.inputmethod.Kotoeri";
pub const KOTOERI_JAPANESE_ID: &str = "com.apple.inputmethod.Kotoeri.Japanese";

/// Layout data carried by a [`MemoryPlatform`] source
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    layout: Option<Arc<LayoutTable>>,
}

impl MemoryHandle {
    pub fn layout(&self) -> Option<&LayoutTable> {
        self.layout.as_deref()
    }
}

struct Registered {
    source: InputSource<MemoryHandle>,
    enabled: bool,
    /// Keyboard layout an input method types with
    layout_source: Option<InputSourceId>,
}

#[derive(Default)]
struct Registry {
    sources: IndexMap<InputSourceId, Registered>,
    selected: Option<InputSourceId>,
    last_ascii_layout: Option<InputSourceId>,
    subscribers: IndexMap<SubscriptionId, NotificationCallback>,
    next_subscription: u64,
}

impl Registry {
    fn get(&self, id: &InputSourceId) -> Result<&Registered, PlatformError> {
        self.sources
            .get(id)
            .ok_or_else(|| PlatformError::SourceNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &InputSourceId) -> Result<&mut Registered, PlatformError> {
        self.sources
            .get_mut(id)
            .ok_or_else(|| PlatformError::SourceNotFound(id.to_string()))
    }

    /// Keyboard layout used by `id`: itself, or the layout of an input method
    fn layout_for(&self, id: &InputSourceId) -> Result<&Registered, PlatformError> {
        let entry = self.get(id)?;
        if entry.source.kind() == InputSourceKind::KeyboardLayout {
            return Ok(entry);
        }
        match &entry.layout_source {
            Some(layout_id) => self.get(layout_id),
            None => Err(PlatformError::MissingLayoutData(id.to_string())),
        }
    }

    fn is_ascii_layout(&self, id: &InputSourceId) -> bool {
        self.sources.get(id).is_some_and(|entry| {
            entry.enabled
                && entry.source.kind() == InputSourceKind::KeyboardLayout
                && entry.source.is_ascii_capable()
        })
    }

    fn first_ascii_layout(&self) -> Option<InputSourceId> {
        self.sources
            .keys()
            .find(|id| self.is_ascii_layout(id))
            .cloned()
    }

    fn callbacks(&self) -> SmallVec<[NotificationCallback; 4]> {
        self.subscribers.values().cloned().collect()
    }
}

/// Thread-safe in-memory implementation of [`KeyboardPlatform`].
///
/// Clones share the same registry. Change notifications are delivered
/// synchronously on the thread that made the change, after the registry
/// lock has been released.
#[derive(Clone)]
pub struct MemoryPlatform {
    registry: Arc<RwLock<Registry>>,
    translate_calls: Arc<AtomicU64>,
}

impl MemoryPlatform {
    /// Platform with no input sources
    pub fn empty() -> Self {
        Self {
            registry: Arc::new(RwLock::new(Registry::default())),
            translate_calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Platform with the built-in sources installed, ABC enabled and selected
    pub fn new() -> Self {
        let platform = Self::empty();
        platform.add_layout(layouts::abc(), "ABC");
        platform.add_layout(layouts::us(), "U.S.");
        platform.add_layout(layouts::dvorak(), "Dvorak");
        platform.add_input_method(
            InputSource::new(KOTOERI_ID, MemoryHandle::default())
                .with_name("Japanese")
                .with_kind(InputSourceKind::InputMethod)
                .with_ascii_capable(false),
            Some(ABC_ID),
        );
        platform.add_input_method(
            InputSource::new(KOTOERI_JAPANESE_ID, MemoryHandle::default())
                .with_name("Hiragana")
                .with_kind(InputSourceKind::InputMode)
                .with_ascii_capable(false),
            Some(ABC_ID),
        );

        {
            let mut registry = platform.registry.write();
            if let Some(entry) = registry.sources.get_mut(ABC_ID) {
                entry.enabled = true;
            }
            registry.selected = Some(InputSourceId::from(ABC_ID));
            registry.last_ascii_layout = Some(InputSourceId::from(ABC_ID));
        }
        platform
    }

    /// Install a keyboard layout (disabled until enabled)
    pub fn add_layout(&self, table: LayoutTable, name: &str) -> InputSource<MemoryHandle> {
        let source = InputSource::new(
            table.id().to_string(),
            MemoryHandle {
                layout: Some(Arc::new(table)),
            },
        )
        .with_name(name);
        self.insert(source.clone(), None);
        source
    }

    /// Install an input method or input mode that types with `layout_id`
    pub fn add_input_method(
        &self,
        source: InputSource<MemoryHandle>,
        layout_id: Option<&str>,
    ) -> InputSource<MemoryHandle> {
        self.insert(source.clone(), layout_id.map(InputSourceId::from));
        source
    }

    fn insert(&self, source: InputSource<MemoryHandle>, layout_source: Option<InputSourceId>) {
        debug!("Registering input source {}", source);
        self.registry.write().sources.insert(
            source.id().clone(),
            Registered {
                source,
                enabled: false,
                layout_source,
            },
        );
    }

    /// Look up any installed source by identifier
    pub fn source(&self, id: &str) -> Option<InputSource<MemoryHandle>> {
        self.registry
            .read()
            .sources
            .get(id)
            .map(|entry| entry.source.clone())
    }

    /// Identifier of the selected source
    pub fn selected(&self) -> Option<InputSourceId> {
        self.registry.read().selected.clone()
    }

    pub fn is_enabled(&self, id: &str) -> bool {
        self.registry
            .read()
            .sources
            .get(id)
            .is_some_and(|entry| entry.enabled)
    }

    /// Enable and select `id` in one step
    pub fn activate(&self, id: &str) -> Result<(), PlatformError> {
        let source = self
            .source(id)
            .ok_or_else(|| PlatformError::SourceNotFound(id.to_string()))?;
        self.enable(&source)?;
        self.select(&source)
    }

    /// Deliver a selection-changed notification without changing anything
    pub fn notify_selected_changed(&self) {
        self.notify(&[PlatformNotification::SelectedSourceChanged]);
    }

    /// Number of translation primitive calls served so far
    pub fn translate_calls(&self) -> u64 {
        self.translate_calls.load(Ordering::Relaxed)
    }

    fn notify(&self, notifications: &[PlatformNotification]) {
        let callbacks = self.registry.read().callbacks();
        for notification in notifications {
            trace!("Delivering {:?} to {} subscribers", notification, callbacks.len());
            for callback in &callbacks {
                callback(*notification);
            }
        }
    }
}

impl Default for MemoryPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.read();
        f.debug_struct("MemoryPlatform")
            .field("sources", &registry.sources.len())
            .field("selected", &registry.selected)
            .field("subscribers", &registry.subscribers.len())
            .finish()
    }
}

impl KeyboardPlatform for MemoryPlatform {
    type Handle = MemoryHandle;

    fn input_sources(
        &self,
        include_all_installed: bool,
    ) -> Result<Vec<InputSource<MemoryHandle>>, PlatformError> {
        Ok(self
            .registry
            .read()
            .sources
            .values()
            .filter(|entry| include_all_installed || entry.enabled)
            .map(|entry| entry.source.clone())
            .collect())
    }

    fn current_keyboard_layout(&self) -> Result<InputSource<MemoryHandle>, PlatformError> {
        let registry = self.registry.read();
        let selected = registry
            .selected
            .as_ref()
            .ok_or(PlatformError::NoActiveInputSource)?;
        Ok(registry.layout_for(selected)?.source.clone())
    }

    fn current_ascii_capable_layout(&self) -> Result<InputSource<MemoryHandle>, PlatformError> {
        let registry = self.registry.read();
        let id = registry
            .last_ascii_layout
            .clone()
            .filter(|id| registry.is_ascii_layout(id))
            .or_else(|| registry.first_ascii_layout())
            .ok_or(PlatformError::NoActiveInputSource)?;
        Ok(registry.get(&id)?.source.clone())
    }

    fn enable(&self, source: &InputSource<MemoryHandle>) -> Result<(), PlatformError> {
        let changed = {
            let mut registry = self.registry.write();
            let entry = registry.get_mut(source.id())?;
            !std::mem::replace(&mut entry.enabled, true)
        };
        if changed {
            debug!("Enabled input source {}", source.id());
            self.notify(&[PlatformNotification::EnabledSourcesChanged]);
        }
        Ok(())
    }

    fn disable(&self, source: &InputSource<MemoryHandle>) -> Result<(), PlatformError> {
        let (changed, reselected) = {
            let mut registry = self.registry.write();
            let entry = registry.get_mut(source.id())?;
            let changed = std::mem::replace(&mut entry.enabled, false);
            let mut reselected = false;
            if changed && registry.selected.as_ref() == Some(source.id()) {
                let fallback = registry.first_ascii_layout().or_else(|| {
                    registry
                        .sources
                        .iter()
                        .find(|(_, entry)| entry.enabled)
                        .map(|(id, _)| id.clone())
                });
                debug!(
                    "Selected source {} disabled, falling back to {:?}",
                    source.id(),
                    fallback
                );
                registry.selected = fallback;
                reselected = true;
            }
            (changed, reselected)
        };

        match (changed, reselected) {
            (false, _) => {}
            (true, false) => self.notify(&[PlatformNotification::EnabledSourcesChanged]),
            (true, true) => self.notify(&[
                PlatformNotification::EnabledSourcesChanged,
                PlatformNotification::SelectedSourceChanged,
            ]),
        }
        Ok(())
    }

    fn select(&self, source: &InputSource<MemoryHandle>) -> Result<(), PlatformError> {
        let changed = {
            let mut registry = self.registry.write();
            let entry = registry.get(source.id())?;
            if !entry.enabled {
                return Err(PlatformError::Unsupported(format!(
                    "selecting disabled input source {}",
                    source.id()
                )));
            }
            if registry.selected.as_ref() == Some(source.id()) {
                false
            } else {
                if registry.is_ascii_layout(source.id()) {
                    registry.last_ascii_layout = Some(source.id().clone());
                }
                registry.selected = Some(source.id().clone());
                true
            }
        };
        if changed {
            debug!("Selected input source {}", source.id());
            self.notify(&[PlatformNotification::SelectedSourceChanged]);
        }
        Ok(())
    }

    fn translate(
        &self,
        source: &InputSource<MemoryHandle>,
        code: KeyCode,
        modifiers: NativeModifiers,
        dead_key_state: &mut DeadKeyState,
        mode: DeadKeyMode,
    ) -> Result<Translation, PlatformError> {
        self.translate_calls.fetch_add(1, Ordering::Relaxed);
        let table = source
            .handle()
            .layout()
            .ok_or_else(|| PlatformError::MissingLayoutData(source.id().to_string()))?;
        Ok(table.translate(code, modifiers, dead_key_state, mode))
    }

    fn subscribe(&self, callback: NotificationCallback) -> Result<SubscriptionId, PlatformError> {
        let mut registry = self.registry.write();
        registry.next_subscription += 1;
        let id = SubscriptionId(registry.next_subscription);
        registry.subscribers.insert(id, callback);
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.registry.write().subscribers.shift_remove(&id);
    }
}
