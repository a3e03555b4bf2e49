// Keylayout
// Layout-aware key translation with the native macOS input-source backend

pub use keylayout_core::*;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(target_os = "macos")]
pub use macos::{CarbonPlatform, TisInputSource};

/// Engine bound to the host's input sources, configured from the default
/// settings file when there is one.
#[cfg(target_os = "macos")]
pub fn system_layout() -> Result<KeyboardLayout<CarbonPlatform>, LayoutError> {
    let settings = match Settings::load_default() {
        Ok(settings) => settings,
        Err(err) => {
            log::warn!("Ignoring unreadable settings: {}", err);
            Settings::new()
        }
    };
    KeyboardLayout::with_settings(CarbonPlatform::from_settings(&settings), &settings)
}

/// Engine over the in-memory platform with its built-in layouts
pub fn memory_layout() -> Result<(MemoryPlatform, KeyboardLayout<MemoryPlatform>), LayoutError> {
    let platform = MemoryPlatform::new();
    let layout = KeyboardLayout::new(platform.clone())?;
    Ok((platform, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn test_memory_layout_facade() {
        init_logging();
        let (platform, layout) = memory_layout().unwrap();
        assert_eq!(layout.current_key_code(LogicalKey::V), Some(KeyCode(9)));
        platform.activate("com.apple.keylayout.Dvorak").unwrap();
        assert_eq!(layout.current_key_code(LogicalKey::V), Some(KeyCode(47)));
    }
}
