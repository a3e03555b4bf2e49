//! Text Input Sources backend
//!
//! Input sources come from `TISCreateInputSourceList` and friends, key
//! translation from `UCKeyTranslate` over the source's `'uchr'` layout data.
//! Change notifications arrive through the distributed notification center
//! on the run loop of the thread that made the first subscription, so that
//! thread must run a CFRunLoop.

use std::fmt;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use libc::c_void;
use log::{debug, error, trace};
use parking_lot::Mutex;

use keylayout_core::{
    DeadKeyMode, DeadKeyState, InputSource, InputSourceKind, KeyCode, KeyboardPlatform,
    NativeModifiers, NotificationCallback, PlatformError, PlatformNotification, SubscriptionId,
    Translation,
};

use super::ffi;

/// A retained `TISInputSourceRef`.
pub struct TisInputSource(NonNull<ffi::TISInputSource>);

// SAFETY: TIS input source objects are immutable CoreFoundation types whose
// retain count is managed atomically.
unsafe impl Send for TisInputSource {}
unsafe impl Sync for TisInputSource {}

impl TisInputSource {
    /// Take ownership of a reference obtained from a Create or Copy call
    unsafe fn from_owned(raw: ffi::TISInputSourceRef) -> Option<Self> {
        NonNull::new(raw).map(Self)
    }

    /// Retain a reference obtained from a Get call
    unsafe fn from_borrowed(raw: ffi::TISInputSourceRef) -> Option<Self> {
        let source = NonNull::new(raw)?;
        ffi::CFRetain(source.as_ptr() as ffi::CFTypeRef);
        Some(Self(source))
    }

    fn as_ptr(&self) -> ffi::TISInputSourceRef {
        self.0.as_ptr()
    }

    fn property(&self, key: ffi::CFStringRef) -> *mut c_void {
        unsafe { ffi::TISGetInputSourceProperty(self.as_ptr(), key) }
    }

    fn string_property(&self, key: ffi::CFStringRef) -> Option<String> {
        let value = self.property(key);
        if value.is_null() {
            return None;
        }
        Some(unsafe { cfstring_to_string(value as ffi::CFStringRef) })
    }

    fn bool_property(&self, key: ffi::CFStringRef) -> Option<bool> {
        let value = self.property(key);
        if value.is_null() {
            return None;
        }
        Some(unsafe { ffi::CFBooleanGetValue(value as ffi::CFBooleanRef) != 0 })
    }

    fn id(&self) -> Option<String> {
        self.string_property(unsafe { ffi::kTISPropertyInputSourceID })
    }

    fn kind(&self) -> InputSourceKind {
        let value = self.property(unsafe { ffi::kTISPropertyInputSourceType });
        if value.is_null() {
            return InputSourceKind::Other;
        }
        let is = |name: ffi::CFStringRef| unsafe { ffi::CFEqual(value as ffi::CFTypeRef, name) != 0 };
        unsafe {
            if is(ffi::kTISTypeKeyboardLayout) {
                InputSourceKind::KeyboardLayout
            } else if is(ffi::kTISTypeKeyboardInputMode) {
                InputSourceKind::InputMode
            } else if is(ffi::kTISTypeKeyboardInputMethodWithoutModes)
                || is(ffi::kTISTypeKeyboardInputMethodModeEnabled)
            {
                InputSourceKind::InputMethod
            } else {
                InputSourceKind::Other
            }
        }
    }

    /// Pointer into the source's `'uchr'` data, valid while `self` is alive
    fn key_layout(&self) -> Option<*const ffi::UCKeyboardLayout> {
        let data = self.property(unsafe { ffi::kTISPropertyUnicodeKeyLayoutData });
        if data.is_null() {
            return None;
        }
        let bytes = unsafe { ffi::CFDataGetBytePtr(data as ffi::CFDataRef) };
        (!bytes.is_null()).then_some(bytes as *const ffi::UCKeyboardLayout)
    }

    fn into_input_source(self) -> Option<InputSource<TisInputSource>> {
        let id = self.id()?;
        let name = self.string_property(unsafe { ffi::kTISPropertyLocalizedName });
        let kind = self.kind();
        let ascii_capable = self
            .bool_property(unsafe { ffi::kTISPropertyInputSourceIsASCIICapable })
            .unwrap_or(false);

        let mut source = InputSource::new(id, self)
            .with_kind(kind)
            .with_ascii_capable(ascii_capable);
        if let Some(name) = name {
            source = source.with_name(name);
        }
        Some(source)
    }
}

impl Clone for TisInputSource {
    fn clone(&self) -> Self {
        unsafe { ffi::CFRetain(self.as_ptr() as ffi::CFTypeRef) };
        Self(self.0)
    }
}

impl Drop for TisInputSource {
    fn drop(&mut self) {
        unsafe { ffi::CFRelease(self.as_ptr() as ffi::CFTypeRef) };
    }
}

impl fmt::Debug for TisInputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TisInputSource").field(&self.id()).finish()
    }
}

unsafe fn cfstring_to_string(string: ffi::CFStringRef) -> String {
    let length = ffi::CFStringGetLength(string);
    let mut buffer: Vec<ffi::UniChar> = vec![0; length.max(0) as usize];
    ffi::CFStringGetCharacters(
        string,
        ffi::CFRange {
            location: 0,
            length,
        },
        buffer.as_mut_ptr(),
    );
    String::from_utf16_lossy(&buffer)
}

fn status(operation: &'static str, status: ffi::OSStatus) -> Result<(), PlatformError> {
    if status == ffi::noErr {
        Ok(())
    } else {
        Err(PlatformError::Status { operation, status })
    }
}

#[derive(Default)]
struct Subscribers {
    next: AtomicU64,
    callbacks: Mutex<Vec<(SubscriptionId, NotificationCallback)>>,
}

impl Subscribers {
    fn deliver(&self, notification: PlatformNotification) {
        let callbacks: Vec<NotificationCallback> = self
            .callbacks
            .lock()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        trace!("Delivering {:?} to {} subscribers", notification, callbacks.len());
        for callback in callbacks {
            callback(notification);
        }
    }
}

extern "C" fn on_distributed_notification(
    _center: ffi::CFNotificationCenterRef,
    observer: *mut c_void,
    name: ffi::CFStringRef,
    _object: *const c_void,
    _user_info: ffi::CFDictionaryRef,
) {
    if observer.is_null() || name.is_null() {
        return;
    }
    // SAFETY: `observer` is the `Subscribers` pointer registered in
    // `CarbonPlatform::observe`, kept alive until the observer is removed.
    let subscribers = unsafe { &*(observer as *const Subscribers) };
    let notification = unsafe {
        if ffi::CFEqual(name, ffi::kTISNotifySelectedKeyboardInputSourceChanged) != 0 {
            PlatformNotification::SelectedSourceChanged
        } else if ffi::CFEqual(name, ffi::kTISNotifyEnabledKeyboardInputSourcesChanged) != 0 {
            PlatformNotification::EnabledSourcesChanged
        } else {
            return;
        }
    };
    subscribers.deliver(notification);
}

/// [`KeyboardPlatform`] over the macOS Text Input Sources services.
pub struct CarbonPlatform {
    keyboard_type: Option<u32>,
    subscribers: Arc<Subscribers>,
    observing: Mutex<bool>,
}

impl CarbonPlatform {
    pub fn new() -> Self {
        Self {
            keyboard_type: None,
            subscribers: Arc::new(Subscribers::default()),
            observing: Mutex::new(false),
        }
    }

    /// Translate as keyboard type `keyboard_type` instead of `LMGetKbdType()`
    pub fn with_keyboard_type(mut self, keyboard_type: u32) -> Self {
        self.keyboard_type = Some(keyboard_type);
        self
    }

    pub fn from_settings(settings: &keylayout_core::Settings) -> Self {
        let platform = Self::new();
        match settings.keyboard_type() {
            Some(keyboard_type) => platform.with_keyboard_type(keyboard_type),
            None => platform,
        }
    }

    fn keyboard_type(&self) -> u32 {
        self.keyboard_type
            .unwrap_or_else(|| u32::from(unsafe { ffi::LMGetKbdType() }))
    }

    fn observe(&self) {
        let mut observing = self.observing.lock();
        if *observing {
            return;
        }
        let observer = Arc::as_ptr(&self.subscribers) as *const c_void;
        unsafe {
            let center = ffi::CFNotificationCenterGetDistributedCenter();
            for name in [
                ffi::kTISNotifySelectedKeyboardInputSourceChanged,
                ffi::kTISNotifyEnabledKeyboardInputSourcesChanged,
            ] {
                ffi::CFNotificationCenterAddObserver(
                    center,
                    observer,
                    on_distributed_notification,
                    name,
                    ptr::null(),
                    ffi::kCFNotificationSuspensionBehaviorDeliverImmediately,
                );
            }
        }
        debug!("Observing input source notifications");
        *observing = true;
    }

    fn current(
        &self,
        copy: unsafe extern "C" fn() -> ffi::TISInputSourceRef,
        operation: &'static str,
    ) -> Result<InputSource<TisInputSource>, PlatformError> {
        let source = unsafe { TisInputSource::from_owned(copy()) }.ok_or_else(|| {
            error!("`{}` returned null ptr", operation);
            PlatformError::NoActiveInputSource
        })?;
        source
            .into_input_source()
            .ok_or(PlatformError::NoActiveInputSource)
    }
}

impl Default for CarbonPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CarbonPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarbonPlatform")
            .field("keyboard_type", &self.keyboard_type)
            .field("observing", &*self.observing.lock())
            .finish()
    }
}

impl Drop for CarbonPlatform {
    fn drop(&mut self) {
        if *self.observing.get_mut() {
            let observer = Arc::as_ptr(&self.subscribers) as *const c_void;
            unsafe {
                ffi::CFNotificationCenterRemoveObserver(
                    ffi::CFNotificationCenterGetDistributedCenter(),
                    observer,
                    ptr::null(),
                    ptr::null(),
                );
            }
        }
    }
}

impl KeyboardPlatform for CarbonPlatform {
    type Handle = TisInputSource;

    fn input_sources(
        &self,
        include_all_installed: bool,
    ) -> Result<Vec<InputSource<TisInputSource>>, PlatformError> {
        let list = unsafe {
            ffi::TISCreateInputSourceList(ptr::null(), u8::from(include_all_installed))
        };
        if list.is_null() {
            return Ok(Vec::new());
        }
        let count = unsafe { ffi::CFArrayGetCount(list) };
        let sources = (0..count)
            .filter_map(|index| unsafe {
                let raw = ffi::CFArrayGetValueAtIndex(list, index) as ffi::TISInputSourceRef;
                TisInputSource::from_borrowed(raw)
            })
            .filter_map(TisInputSource::into_input_source)
            .collect();
        unsafe { ffi::CFRelease(list) };
        Ok(sources)
    }

    fn current_keyboard_layout(&self) -> Result<InputSource<TisInputSource>, PlatformError> {
        self.current(
            ffi::TISCopyCurrentKeyboardLayoutInputSource,
            "TISCopyCurrentKeyboardLayoutInputSource",
        )
    }

    fn current_ascii_capable_layout(&self) -> Result<InputSource<TisInputSource>, PlatformError> {
        self.current(
            ffi::TISCopyCurrentASCIICapableKeyboardLayoutInputSource,
            "TISCopyCurrentASCIICapableKeyboardLayoutInputSource",
        )
    }

    fn enable(&self, source: &InputSource<TisInputSource>) -> Result<(), PlatformError> {
        status("TISEnableInputSource", unsafe {
            ffi::TISEnableInputSource(source.handle().as_ptr())
        })
    }

    fn disable(&self, source: &InputSource<TisInputSource>) -> Result<(), PlatformError> {
        status("TISDisableInputSource", unsafe {
            ffi::TISDisableInputSource(source.handle().as_ptr())
        })
    }

    fn select(&self, source: &InputSource<TisInputSource>) -> Result<(), PlatformError> {
        status("TISSelectInputSource", unsafe {
            ffi::TISSelectInputSource(source.handle().as_ptr())
        })
    }

    fn translate(
        &self,
        source: &InputSource<TisInputSource>,
        code: KeyCode,
        modifiers: NativeModifiers,
        dead_key_state: &mut DeadKeyState,
        mode: DeadKeyMode,
    ) -> Result<Translation, PlatformError> {
        let layout = source
            .handle()
            .key_layout()
            .ok_or_else(|| PlatformError::MissingLayoutData(source.id().to_string()))?;
        let options = match mode {
            DeadKeyMode::Compose => 0,
            DeadKeyMode::Suppress => ffi::kUCKeyTranslateNoDeadKeysMask,
        };

        let mut buffer = [0 as ffi::UniChar; 16];
        let mut length: ffi::UniCharCount = 0;
        let result = unsafe {
            ffi::UCKeyTranslate(
                layout,
                code.code(),
                ffi::kUCKeyActionDown,
                modifiers.key_translate_state(),
                self.keyboard_type(),
                options,
                dead_key_state.raw_mut(),
                buffer.len() as ffi::UniCharCount,
                &mut length,
                buffer.as_mut_ptr(),
            )
        };
        status("UCKeyTranslate", result)?;

        let length = (length as usize).min(buffer.len());
        if length == 0 && dead_key_state.is_pending() {
            return Ok(Translation::dead_key_start());
        }
        Ok(Translation::text(String::from_utf16_lossy(&buffer[..length])))
    }

    fn subscribe(&self, callback: NotificationCallback) -> Result<SubscriptionId, PlatformError> {
        self.observe();
        let id = SubscriptionId(self.subscribers.next.fetch_add(1, Ordering::Relaxed) + 1);
        self.subscribers.callbacks.lock().push((id, callback));
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscribers
            .callbacks
            .lock()
            .retain(|(subscription, _)| *subscription != id);
    }
}
