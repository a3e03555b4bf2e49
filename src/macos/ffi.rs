// Carbon Text Input Sources, Unicode Utilities and CoreFoundation bindings

#![allow(non_upper_case_globals, non_snake_case, dead_code)]

use libc::{c_long, c_ulong, c_ushort, c_void};

pub type Boolean = u8;
pub type CFIndex = c_long;
pub type CFTypeRef = *const c_void;
pub type CFStringRef = *const c_void;
pub type CFArrayRef = *const c_void;
pub type CFDataRef = *const c_void;
pub type CFBooleanRef = *const c_void;
pub type CFDictionaryRef = *const c_void;
pub type CFNotificationCenterRef = *const c_void;
pub type CFNotificationSuspensionBehavior = CFIndex;
pub type CFNotificationCallback = extern "C" fn(
    center: CFNotificationCenterRef,
    observer: *mut c_void,
    name: CFStringRef,
    object: *const c_void,
    user_info: CFDictionaryRef,
);

pub type OSStatus = i32;
pub type OptionBits = u32;
pub type UniCharCount = c_ulong;
pub type UniChar = c_ushort;

#[repr(C)]
pub struct TISInputSource {
    _private: [u8; 0],
}
pub type TISInputSourceRef = *mut TISInputSource;

#[repr(C)]
pub struct UCKeyboardLayout {
    _private: [u8; 0],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct CFRange {
    pub location: CFIndex,
    pub length: CFIndex,
}

pub const noErr: OSStatus = 0;
pub const kUCKeyActionDown: u16 = 0;
pub const kUCKeyTranslateNoDeadKeysMask: OptionBits = 1;
pub const kCFNotificationSuspensionBehaviorDeliverImmediately: CFNotificationSuspensionBehavior = 4;

#[link(name = "Carbon", kind = "framework")]
extern "C" {
    pub static kTISPropertyInputSourceID: CFStringRef;
    pub static kTISPropertyLocalizedName: CFStringRef;
    pub static kTISPropertyInputSourceType: CFStringRef;
    pub static kTISPropertyInputSourceIsASCIICapable: CFStringRef;
    pub static kTISPropertyUnicodeKeyLayoutData: CFStringRef;

    pub static kTISTypeKeyboardLayout: CFStringRef;
    pub static kTISTypeKeyboardInputMethodWithoutModes: CFStringRef;
    pub static kTISTypeKeyboardInputMethodModeEnabled: CFStringRef;
    pub static kTISTypeKeyboardInputMode: CFStringRef;

    pub static kTISNotifySelectedKeyboardInputSourceChanged: CFStringRef;
    pub static kTISNotifyEnabledKeyboardInputSourcesChanged: CFStringRef;

    pub fn TISCreateInputSourceList(
        properties: CFDictionaryRef,
        includeAllInstalled: Boolean,
    ) -> CFArrayRef;

    pub fn TISCopyCurrentKeyboardLayoutInputSource() -> TISInputSourceRef;

    pub fn TISCopyCurrentASCIICapableKeyboardLayoutInputSource() -> TISInputSourceRef;

    pub fn TISGetInputSourceProperty(
        inputSource: TISInputSourceRef,
        propertyKey: CFStringRef,
    ) -> *mut c_void;

    pub fn TISEnableInputSource(inputSource: TISInputSourceRef) -> OSStatus;

    pub fn TISDisableInputSource(inputSource: TISInputSourceRef) -> OSStatus;

    pub fn TISSelectInputSource(inputSource: TISInputSourceRef) -> OSStatus;

    pub fn LMGetKbdType() -> u8;

    pub fn UCKeyTranslate(
        keyLayoutPtr: *const UCKeyboardLayout,
        virtualKeyCode: u16,
        keyAction: u16,
        modifierKeyState: u32,
        keyboardType: u32,
        keyTranslateOptions: OptionBits,
        deadKeyState: *mut u32,
        maxStringLength: UniCharCount,
        actualStringLength: *mut UniCharCount,
        unicodeString: *mut UniChar,
    ) -> OSStatus;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    pub fn CFRetain(cf: CFTypeRef) -> CFTypeRef;

    pub fn CFRelease(cf: CFTypeRef);

    pub fn CFEqual(cf1: CFTypeRef, cf2: CFTypeRef) -> Boolean;

    pub fn CFArrayGetCount(theArray: CFArrayRef) -> CFIndex;

    pub fn CFArrayGetValueAtIndex(theArray: CFArrayRef, idx: CFIndex) -> *const c_void;

    pub fn CFDataGetBytePtr(theData: CFDataRef) -> *const u8;

    pub fn CFStringGetLength(theString: CFStringRef) -> CFIndex;

    pub fn CFStringGetCharacters(theString: CFStringRef, range: CFRange, buffer: *mut UniChar);

    pub fn CFBooleanGetValue(boolean: CFBooleanRef) -> Boolean;

    pub fn CFNotificationCenterGetDistributedCenter() -> CFNotificationCenterRef;

    pub fn CFNotificationCenterAddObserver(
        center: CFNotificationCenterRef,
        observer: *const c_void,
        callBack: CFNotificationCallback,
        name: CFStringRef,
        object: *const c_void,
        suspensionBehavior: CFNotificationSuspensionBehavior,
    );

    pub fn CFNotificationCenterRemoveObserver(
        center: CFNotificationCenterRef,
        observer: *const c_void,
        name: CFStringRef,
        object: *const c_void,
    );
}
