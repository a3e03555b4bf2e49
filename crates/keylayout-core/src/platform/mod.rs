//! Platform contract
//!
//! This module defines the interface the layout engine consumes from the host:
//! input-source enumeration and selection, the key translation primitive, and
//! input-source change notifications.

pub mod memory;

use std::fmt;
use std::sync::Arc;

use crate::{InputSource, KeyCode, NativeModifiers};

pub use memory::{MemoryHandle, MemoryPlatform};

/// Error type for platform operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    /// The platform reports no selected keyboard input source
    #[error("no active keyboard input source")]
    NoActiveInputSource,

    /// No input source with this identifier is known
    #[error("input source not found: {0}")]
    SourceNotFound(String),

    /// The input source carries no key layout data to translate with
    #[error("input source has no key layout data: {0}")]
    MissingLayoutData(String),

    /// A platform call returned a failure status
    #[error("{operation} failed with status {status}")]
    Status { operation: &'static str, status: i32 },

    /// The operation is not available for this source or platform
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Opaque dead-key composition state threaded through translation calls.
///
/// Zero means "nothing pending"; any other value is owned by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeadKeyState(u32);

impl DeadKeyState {
    pub const fn new() -> Self {
        Self(0)
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    /// Mutable access for platforms that write the state in place
    pub fn raw_mut(&mut self) -> &mut u32 {
        &mut self.0
    }

    pub fn is_pending(self) -> bool {
        self.0 != 0
    }

    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

/// How the translation primitive treats dead keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeadKeyMode {
    /// Dead keys start a composition and produce no text until resolved
    #[default]
    Compose,
    /// Dead keys produce their standalone character and leave no state
    Suppress,
}

/// Result of one call to the translation primitive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Translation {
    /// Produced text; `None` when the key types nothing
    pub text: Option<String>,
    /// The key started a dead-key composition
    pub dead_key_start: bool,
}

impl Translation {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            text: if text.is_empty() { None } else { Some(text) },
            dead_key_start: false,
        }
    }

    pub fn dead_key_start() -> Self {
        Self {
            text: None,
            dead_key_start: true,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

/// Input-source change reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformNotification {
    /// The selected keyboard input source changed (or may have)
    SelectedSourceChanged,
    /// The set of enabled input sources changed
    EnabledSourcesChanged,
}

/// Callback invoked on whatever thread the platform delivers notifications.
pub type NotificationCallback = Arc<dyn Fn(PlatformNotification) + Send + Sync>;

/// Handle for removing a notification subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "subscription#{}", self.0)
    }
}

/// Trait for keyboard input-source platforms
///
/// Implementations wrap the host's input-source services. Their calls are
/// not expected to be safe to run concurrently against the same source
/// handle; the engine serialises its own use.
pub trait KeyboardPlatform: Send + Sync + 'static {
    /// Platform handle needed to translate against one source
    type Handle: Clone + Send + Sync + fmt::Debug + 'static;

    /// Enabled input sources, or every installed one
    fn input_sources(
        &self,
        include_all_installed: bool,
    ) -> Result<Vec<InputSource<Self::Handle>>, PlatformError>;

    /// The keyboard layout the selected input source types with
    fn current_keyboard_layout(&self) -> Result<InputSource<Self::Handle>, PlatformError>;

    /// The keyboard layout used when ASCII input is required
    fn current_ascii_capable_layout(&self) -> Result<InputSource<Self::Handle>, PlatformError>;

    fn enable(&self, source: &InputSource<Self::Handle>) -> Result<(), PlatformError>;

    fn disable(&self, source: &InputSource<Self::Handle>) -> Result<(), PlatformError>;

    fn select(&self, source: &InputSource<Self::Handle>) -> Result<(), PlatformError>;

    /// Translate one physical key under `source`.
    ///
    /// `dead_key_state` is read as the pending composition and written with
    /// the composition left after this key. Codes the layout does not know
    /// produce an empty translation, not an error.
    fn translate(
        &self,
        source: &InputSource<Self::Handle>,
        code: KeyCode,
        modifiers: NativeModifiers,
        dead_key_state: &mut DeadKeyState,
        mode: DeadKeyMode,
    ) -> Result<Translation, PlatformError>;

    /// Register for input-source change notifications
    fn subscribe(&self, callback: NotificationCallback) -> Result<SubscriptionId, PlatformError>;

    /// Remove a subscription; unknown ids are ignored
    fn unsubscribe(&self, id: SubscriptionId);

    /// Find a source by identifier
    fn find_input_source(
        &self,
        id: &str,
        include_all_installed: bool,
    ) -> Result<Option<InputSource<Self::Handle>>, PlatformError> {
        Ok(self
            .input_sources(include_all_installed)?
            .into_iter()
            .find(|source| source.id().as_str() == id))
    }
}
