//! Keyboard layout translation engine
//!
//! [`KeyboardLayout`] answers "which code types this key" and "what does this
//! code type with these modifiers" against the input source the platform has
//! selected right now. Key tables are cached per input source in a
//! [`LayoutSnapshot`] and replaced, never mutated, when the platform reports a
//! different source.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use log::{debug, trace, warn};
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::platform::{
    DeadKeyMode, DeadKeyState, KeyboardPlatform, PlatformError, PlatformNotification,
    SubscriptionId,
};
use crate::snapshot::{LayoutSnapshot, TranslationEntry};
use crate::{
    to_native_flags, InputSource, InputSourceId, KeyCode, LogicalKey, ModifierSet,
    NativeModifiers,
};

/// Errors raised while setting up the engine
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("no active keyboard input source: {0}")]
    NoActiveInputSource(#[source] PlatformError),

    #[error("failed to subscribe to input source changes: {0}")]
    Subscription(#[source] PlatformError),
}

/// Change reported to engine listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutEvent {
    /// The selected keyboard layout now has a different identity
    InputSourceChanged {
        previous: InputSourceId,
        current: InputSourceId,
    },
    /// A rebuilt snapshot places logical keys at different codes than the
    /// snapshot it replaced
    KeyCodesChanged { source: InputSourceId },
    /// The enabled input-source list changed
    EnabledSourcesChanged,
}

/// Handle returned by [`KeyboardLayout::on_change`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&LayoutEvent) + Send + Sync>;

/// Tunables for translation and caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationOptions {
    /// Let dead keys start compositions; when off they type their accent
    pub dead_keys: bool,
    /// Highest physical code scanned when building a snapshot
    pub max_key_code: u16,
    /// Modifier sets translated for every code when a snapshot is built
    pub prewarm: Vec<ModifierSet>,
}

impl TranslationOptions {
    pub(crate) fn dead_key_mode(&self) -> DeadKeyMode {
        if self.dead_keys {
            DeadKeyMode::Compose
        } else {
            DeadKeyMode::Suppress
        }
    }
}

impl Default for TranslationOptions {
    fn default() -> Self {
        Self {
            dead_keys: true,
            max_key_code: 127,
            prewarm: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Current,
    AsciiCapable,
}

struct Slot<H> {
    source: InputSource<H>,
    snapshot: Option<Arc<LayoutSnapshot>>,
}

impl<H> Slot<H> {
    fn new(source: InputSource<H>) -> Self {
        Self {
            source,
            snapshot: None,
        }
    }
}

struct LayoutState<H> {
    current: Slot<H>,
    ascii: Option<Slot<H>>,
    /// Last snapshot dropped from the current slot
    retired: Option<Arc<LayoutSnapshot>>,
    /// Bumped whenever the enabled-source list changes
    sources_epoch: u64,
    sources: Option<Vec<InputSource<H>>>,
    per_source: IndexMap<InputSourceId, Arc<LayoutSnapshot>>,
}

impl<H> LayoutState<H> {
    fn slot_mut(&mut self, kind: SlotKind) -> Option<&mut Slot<H>> {
        match kind {
            SlotKind::Current => Some(&mut self.current),
            SlotKind::AsciiCapable => self.ascii.as_mut(),
        }
    }
}

struct Shared<P: KeyboardPlatform> {
    platform: P,
    options: TranslationOptions,
    state: Mutex<LayoutState<P::Handle>>,
    /// Held across the platform read and the slot swap of one invalidation
    invalidation: Mutex<()>,
    /// Bumped whenever the current source changes identity
    generation: AtomicU64,
    listeners: Mutex<IndexMap<ListenerId, Listener>>,
    next_listener: AtomicU64,
}

impl<P: KeyboardPlatform> Shared<P> {
    fn handle_notification(&self, notification: PlatformNotification) {
        trace!("Platform notification {:?}", notification);
        match notification {
            PlatformNotification::SelectedSourceChanged => {
                self.invalidate();
            }
            PlatformNotification::EnabledSourcesChanged => {
                self.sources_changed();
                // Enabling or disabling can move the selection and the ASCII layout
                self.invalidate();
            }
        }
    }

    /// Re-read the platform's sources and drop snapshots whose identity moved.
    ///
    /// Invalidations run one at a time, so a slow platform read can never
    /// install a source over one read after it.
    fn invalidate(&self) -> bool {
        let mut events = Vec::new();
        let changed = {
            let _serial = self.invalidation.lock();
            self.reread(&mut events)
        };
        // Listeners may call back into the engine
        self.emit(&events);
        changed
    }

    fn reread(&self, events: &mut Vec<LayoutEvent>) -> bool {
        let current = match self.platform.current_keyboard_layout() {
            Ok(source) => source,
            Err(err) => {
                warn!("Cannot read current keyboard layout: {}", err);
                return false;
            }
        };
        let ascii = self.platform.current_ascii_capable_layout().ok();

        {
            let mut guard = self.state.lock();
            let state = &mut *guard;

            let ascii_moved = match (&state.ascii, &ascii) {
                (Some(slot), Some(source)) => !slot.source.same_identity(source),
                (None, None) => false,
                _ => true,
            };
            if ascii_moved {
                debug!(
                    "ASCII-capable layout is now {:?}",
                    ascii.as_ref().map(|source| source.id().to_string())
                );
                state.ascii = ascii.map(Slot::new);
            }

            if state.current.source.same_identity(&current) {
                debug!("Input source {} unchanged, ignoring", current.id());
                false
            } else {
                let previous = std::mem::replace(&mut state.current, Slot::new(current));
                debug!(
                    "Input source changed {} -> {}",
                    previous.source.id(),
                    state.current.source.id()
                );
                if let Some(snapshot) = previous.snapshot {
                    state.retired = Some(snapshot);
                }
                self.generation.fetch_add(1, Ordering::SeqCst);
                events.push(LayoutEvent::InputSourceChanged {
                    previous: previous.source.id().clone(),
                    current: state.current.source.id().clone(),
                });
                true
            }
        }
    }

    fn sources_changed(&self) {
        {
            let mut state = self.state.lock();
            state.sources_epoch += 1;
            state.sources = None;
            state.per_source.clear();
        }
        debug!("Enabled input sources changed, per-source caches dropped");
        self.emit(&[LayoutEvent::EnabledSourcesChanged]);
    }

    fn emit(&self, events: &[LayoutEvent]) {
        if events.is_empty() {
            return;
        }
        let listeners: SmallVec<[Listener; 4]> =
            self.listeners.lock().values().cloned().collect();
        for event in events {
            for listener in &listeners {
                listener(event);
            }
        }
    }

    /// Source and snapshot of a slot, building the snapshot if it is missing.
    ///
    /// The build runs without the state lock held and is installed only when
    /// the slot still names the same source.
    fn slot_snapshot(
        &self,
        kind: SlotKind,
    ) -> Option<(InputSource<P::Handle>, Arc<LayoutSnapshot>)> {
        let (source, cached) = {
            let mut state = self.state.lock();
            let slot = state.slot_mut(kind)?;
            (slot.source.clone(), slot.snapshot.clone())
        };
        if let Some(snapshot) = cached {
            return Some((source, snapshot));
        }

        let built = match LayoutSnapshot::build(&self.platform, &source, &self.options) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!("Cannot build layout snapshot for {}: {}", source.id(), err);
                return None;
            }
        };

        let mut events = Vec::new();
        let snapshot = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let slot = match kind {
                SlotKind::Current => Some(&mut state.current),
                SlotKind::AsciiCapable => state.ascii.as_mut(),
            };
            match slot {
                Some(slot) if slot.source.same_identity(&source) => match slot.snapshot.clone() {
                    Some(existing) => existing,
                    None => {
                        slot.snapshot = Some(Arc::clone(&built));
                        if kind == SlotKind::Current {
                            if let Some(retired) = state.retired.take() {
                                if !retired.same_key_codes(&built) {
                                    events.push(LayoutEvent::KeyCodesChanged {
                                        source: source.id().clone(),
                                    });
                                }
                            }
                        }
                        built
                    }
                },
                // The slot moved on while building; answer for the source the
                // call started with
                _ => built,
            }
        };
        self.emit(&events);
        Some((source, snapshot))
    }

    fn source_snapshot(&self, source: &InputSource<P::Handle>) -> Option<Arc<LayoutSnapshot>> {
        let epoch = {
            let state = self.state.lock();
            if let Some(snapshot) = state.per_source.get(source.id()) {
                return Some(Arc::clone(snapshot));
            }
            state.sources_epoch
        };

        let built = match LayoutSnapshot::build(&self.platform, source, &self.options) {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                warn!("Cannot build layout snapshot for {}: {}", source.id(), err);
                return None;
            }
        };

        let mut state = self.state.lock();
        if state.sources_epoch != epoch {
            return Some(built);
        }
        Some(Arc::clone(
            state
                .per_source
                .entry(source.id().clone())
                .or_insert(built),
        ))
    }

    /// Translate with nothing pending, through the snapshot's cache.
    fn translate_stateless(
        &self,
        source: &InputSource<P::Handle>,
        snapshot: &LayoutSnapshot,
        code: KeyCode,
        modifiers: NativeModifiers,
    ) -> Option<String> {
        if let Some(entry) = snapshot.cached(code, modifiers) {
            return entry.text;
        }
        let mut state = DeadKeyState::new();
        let translation = match self.platform.translate(
            source,
            code,
            modifiers,
            &mut state,
            self.options.dead_key_mode(),
        ) {
            Ok(translation) => translation,
            Err(err) => {
                warn!("Translation of {} under {} failed: {}", code, source.id(), err);
                return None;
            }
        };
        snapshot.store(code, modifiers, TranslationEntry::from(&translation));
        translation.text
    }
}

struct PendingDeadKey {
    state: DeadKeyState,
    generation: u64,
}

/// Layout-aware key translation against the platform's selected input source.
///
/// Lookups take `&self`. Character translation takes `&mut self` because a
/// dead key leaves composition state in the engine that the next call
/// consumes; share one engine across threads behind your own lock.
///
/// Source changes are picked up from platform notifications: the engine
/// re-reads the selected source and, if its identity differs, drops the
/// cached tables and any pending dead key. Tables are rebuilt on the next
/// query.
pub struct KeyboardLayout<P: KeyboardPlatform> {
    shared: Arc<Shared<P>>,
    subscription: SubscriptionId,
    pending: Option<PendingDeadKey>,
}

impl<P: KeyboardPlatform> KeyboardLayout<P> {
    /// Capture the selected input source and subscribe to its changes
    pub fn new(platform: P) -> Result<Self, LayoutError> {
        Self::with_options(platform, TranslationOptions::default())
    }

    #[cfg(feature = "settings")]
    pub fn with_settings(platform: P, settings: &crate::Settings) -> Result<Self, LayoutError> {
        Self::with_options(platform, settings.translation_options())
    }

    pub fn with_options(platform: P, options: TranslationOptions) -> Result<Self, LayoutError> {
        let current = platform
            .current_keyboard_layout()
            .map_err(LayoutError::NoActiveInputSource)?;
        let ascii = match platform.current_ascii_capable_layout() {
            Ok(source) => Some(source),
            Err(err) => {
                debug!("No ASCII-capable layout: {}", err);
                None
            }
        };
        debug!("Keyboard layout engine starting on {}", current);

        let shared = Arc::new(Shared {
            platform,
            options,
            state: Mutex::new(LayoutState {
                current: Slot::new(current),
                ascii: ascii.map(Slot::new),
                retired: None,
                sources_epoch: 0,
                sources: None,
                per_source: IndexMap::new(),
            }),
            invalidation: Mutex::new(()),
            generation: AtomicU64::new(0),
            listeners: Mutex::new(IndexMap::new()),
            next_listener: AtomicU64::new(0),
        });

        let weak: Weak<Shared<P>> = Arc::downgrade(&shared);
        let subscription = shared
            .platform
            .subscribe(Arc::new(move |notification: PlatformNotification| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_notification(notification);
                }
            }))
            .map_err(LayoutError::Subscription)?;

        Ok(Self {
            shared,
            subscription,
            pending: None,
        })
    }

    pub fn platform(&self) -> &P {
        &self.shared.platform
    }

    pub fn options(&self) -> &TranslationOptions {
        &self.shared.options
    }

    /// The keyboard layout the engine currently translates with
    pub fn current_input_source(&self) -> InputSource<P::Handle> {
        self.shared.state.lock().current.source.clone()
    }

    /// Code that produces `key` under the current layout
    pub fn current_key_code(&self, key: LogicalKey) -> Option<KeyCode> {
        let (_, snapshot) = self.shared.slot_snapshot(SlotKind::Current)?;
        snapshot.key_code(key)
    }

    /// Logical key produced by `code` under the current layout
    pub fn current_key(&self, code: KeyCode) -> Option<LogicalKey> {
        let (_, snapshot) = self.shared.slot_snapshot(SlotKind::Current)?;
        snapshot.key(code)
    }

    /// Text `code` types with `modifiers` held.
    ///
    /// Returns `None` for keys that type nothing, including a dead key that
    /// is now waiting for the next keystroke.
    pub fn current_character(&mut self, code: KeyCode, modifiers: ModifierSet) -> Option<String> {
        self.current_character_native(code, to_native_flags(modifiers))
    }

    /// [`current_character`](Self::current_character) with native modifier bits
    pub fn current_character_native(
        &mut self,
        code: KeyCode,
        modifiers: NativeModifiers,
    ) -> Option<String> {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        // A failed build leaves any pending dead key in place
        let (source, snapshot) = self.shared.slot_snapshot(SlotKind::Current)?;
        let pending = match self.pending.take() {
            Some(pending) if pending.generation == generation => pending.state,
            Some(_) => {
                debug!("Discarding dead key pending from a previous input source");
                DeadKeyState::new()
            }
            None => DeadKeyState::new(),
        };
        let mut state = pending;

        let was_pending = state.is_pending();
        if !was_pending {
            match snapshot.cached(code, modifiers) {
                Some(entry) if !entry.dead_key_start => return entry.text,
                _ => {}
            }
        }

        let translation = match self.shared.platform.translate(
            &source,
            code,
            modifiers,
            &mut state,
            self.shared.options.dead_key_mode(),
        ) {
            Ok(translation) => translation,
            Err(err) => {
                warn!("Translation of {} under {} failed: {}", code, source.id(), err);
                if was_pending {
                    self.pending = Some(PendingDeadKey {
                        state: pending,
                        generation,
                    });
                }
                return None;
            }
        };

        if state.is_pending() {
            trace!("Dead key {} pending under {}", code, source.id());
            self.pending = Some(PendingDeadKey { state, generation });
        } else if was_pending {
            trace!("Dead key resolved to {:?}", translation.text);
        }
        if !was_pending {
            snapshot.store(code, modifiers, TranslationEntry::from(&translation));
        }
        translation.text
    }

    /// Whether a dead key is waiting for the next keystroke
    pub fn has_pending_dead_key(&self) -> bool {
        let generation = self.shared.generation.load(Ordering::SeqCst);
        self.pending
            .as_ref()
            .is_some_and(|pending| pending.generation == generation && pending.state.is_pending())
    }

    /// Abandon a pending dead key
    pub fn clear_dead_key(&mut self) {
        self.pending = None;
    }

    /// The platform's current ASCII-capable keyboard layout, if it has one
    pub fn current_ascii_capable_source(&self) -> Option<InputSource<P::Handle>> {
        self.shared
            .state
            .lock()
            .ascii
            .as_ref()
            .map(|slot| slot.source.clone())
    }

    pub fn current_ascii_capable_key_code(&self, key: LogicalKey) -> Option<KeyCode> {
        let (_, snapshot) = self.shared.slot_snapshot(SlotKind::AsciiCapable)?;
        snapshot.key_code(key)
    }

    pub fn current_ascii_capable_key(&self, code: KeyCode) -> Option<LogicalKey> {
        let (_, snapshot) = self.shared.slot_snapshot(SlotKind::AsciiCapable)?;
        snapshot.key(code)
    }

    /// Text `code` types on the ASCII-capable layout; dead keys type nothing
    pub fn current_ascii_capable_character(
        &self,
        code: KeyCode,
        modifiers: ModifierSet,
    ) -> Option<String> {
        let (source, snapshot) = self.shared.slot_snapshot(SlotKind::AsciiCapable)?;
        self.shared
            .translate_stateless(&source, &snapshot, code, to_native_flags(modifiers))
    }

    /// Enabled input sources, cached until the platform reports a change
    pub fn input_sources(&self) -> Vec<InputSource<P::Handle>> {
        let epoch = {
            let state = self.shared.state.lock();
            if let Some(sources) = &state.sources {
                return sources.clone();
            }
            state.sources_epoch
        };
        match self.shared.platform.input_sources(false) {
            Ok(sources) => {
                let mut state = self.shared.state.lock();
                if state.sources_epoch == epoch {
                    state.sources = Some(sources.clone());
                }
                sources
            }
            Err(err) => {
                warn!("Cannot list input sources: {}", err);
                Vec::new()
            }
        }
    }

    /// Code that produces `key` under `source`
    pub fn key_code_with(&self, source: &InputSource<P::Handle>, key: LogicalKey) -> Option<KeyCode> {
        self.shared.source_snapshot(source)?.key_code(key)
    }

    /// Logical key produced by `code` under `source`
    pub fn key_with(&self, source: &InputSource<P::Handle>, code: KeyCode) -> Option<LogicalKey> {
        self.shared.source_snapshot(source)?.key(code)
    }

    /// Text `code` types under `source`; dead keys type nothing
    pub fn character_with(
        &self,
        source: &InputSource<P::Handle>,
        code: KeyCode,
        modifiers: ModifierSet,
    ) -> Option<String> {
        let snapshot = self.shared.source_snapshot(source)?;
        self.shared
            .translate_stateless(source, &snapshot, code, to_native_flags(modifiers))
    }

    /// Re-read the selected source now; true if its identity changed
    pub fn refresh(&self) -> bool {
        self.shared.invalidate()
    }

    /// Register a listener for [`LayoutEvent`]s.
    ///
    /// Listeners run on the thread that delivered the platform notification
    /// or made the query that produced the event.
    pub fn on_change<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&LayoutEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.shared.next_listener.fetch_add(1, Ordering::Relaxed));
        self.shared.listeners.lock().insert(id, Arc::new(listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.listeners.lock().shift_remove(&id).is_some()
    }
}

impl<P: KeyboardPlatform> Drop for KeyboardLayout<P> {
    fn drop(&mut self) {
        self.shared.platform.unsubscribe(self.subscription);
    }
}

impl<P: KeyboardPlatform + fmt::Debug> fmt::Debug for KeyboardLayout<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyboardLayout")
            .field("platform", &self.shared.platform)
            .field("current", self.current_input_source().id())
            .field("pending_dead_key", &self.has_pending_dead_key())
            .finish()
    }
}
