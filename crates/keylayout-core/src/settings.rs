// Keylayout Settings Module
// User-configurable translation and cache behaviour loaded from TOML

#![cfg(feature = "settings")]

use std::path::{Path, PathBuf};

use crate::engine::TranslationOptions;
use crate::ModifierSet;

/// Settings for the layout engine
///
/// These settings are loaded from a TOML file (default:
/// `<config dir>/keylayout/settings.toml`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Let dead keys start compositions
    dead_keys: bool,

    /// Highest physical code scanned per snapshot
    max_key_code: u16,

    /// Keyboard type handed to the platform translator (optional)
    keyboard_type: Option<u32>,

    /// Modifier sets translated eagerly when a snapshot is built
    prewarm: Vec<ModifierSet>,

    /// Path to the settings file (for reload)
    source_path: Option<PathBuf>,
}

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid setting value: {0}")]
    InvalidValue(String),
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
struct SettingsToml {
    #[serde(default)]
    translation: Option<TranslationSection>,

    #[serde(default)]
    cache: Option<CacheSection>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct TranslationSection {
    #[serde(default)]
    dead_keys: Option<toml::Value>,

    #[serde(default)]
    max_key_code: Option<i64>,

    #[serde(default)]
    keyboard_type: Option<i64>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
struct CacheSection {
    #[serde(default)]
    prewarm: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create settings with the built-in defaults
    pub fn new() -> Self {
        let options = TranslationOptions::default();
        Self {
            dead_keys: options.dead_keys,
            max_key_code: options.max_key_code,
            keyboard_type: None,
            prewarm: options.prewarm,
            source_path: None,
        }
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.source_path = Some(path.as_ref().to_path_buf());
        Ok(settings)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let toml_settings: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();

        if let Some(translation) = toml_settings.translation {
            if let Some(value) = translation.dead_keys {
                settings.dead_keys = parse_bool_value(&value)?;
            }
            if let Some(max) = translation.max_key_code {
                settings.max_key_code = u8::try_from(max).map(u16::from).map_err(|_| {
                    SettingsError::InvalidValue(format!("max_key_code {} is outside 0..=255", max))
                })?;
            }
            if let Some(kind) = translation.keyboard_type {
                settings.keyboard_type = Some(u32::try_from(kind).map_err(|_| {
                    SettingsError::InvalidValue(format!("keyboard_type {} is not a valid type", kind))
                })?);
            }
        }

        if let Some(cache) = toml_settings.cache {
            for name in cache.prewarm.unwrap_or_default() {
                let modifiers = name.parse::<ModifierSet>().map_err(|e| {
                    SettingsError::InvalidValue(format!("prewarm entry '{}': {}", name, e))
                })?;
                if !settings.prewarm.contains(&modifiers) {
                    settings.prewarm.push(modifiers);
                }
            }
        }

        Ok(settings)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("keylayout").join("settings.toml"))
    }

    /// Load from the default location, or defaults if there is no file
    pub fn load_default() -> Result<Self, SettingsError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    pub fn dead_keys(&self) -> bool {
        self.dead_keys
    }

    pub fn set_dead_keys(&mut self, enabled: bool) {
        self.dead_keys = enabled;
    }

    pub fn max_key_code(&self) -> u16 {
        self.max_key_code
    }

    /// Get keyboard type override
    pub fn keyboard_type(&self) -> Option<u32> {
        self.keyboard_type
    }

    pub fn prewarm(&self) -> &[ModifierSet] {
        &self.prewarm
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// Engine options described by these settings
    pub fn translation_options(&self) -> TranslationOptions {
        TranslationOptions {
            dead_keys: self.dead_keys,
            max_key_code: self.max_key_code,
            prewarm: self.prewarm.clone(),
        }
    }

    /// Reload settings from the original file
    pub fn reload(&mut self) -> Result<(), SettingsError> {
        if let Some(ref path) = self.source_path {
            let new_settings = Self::from_file(path)?;
            *self = new_settings;
            Ok(())
        } else {
            Err(SettingsError::InvalidValue("No source path set".to_string()))
        }
    }
}

/// Parse a TOML value as a boolean
fn parse_bool_value(value: &toml::Value) -> Result<bool, SettingsError> {
    match value {
        toml::Value::Boolean(b) => Ok(*b),
        toml::Value::Integer(1) => Ok(true),
        toml::Value::Integer(0) => Ok(false),
        toml::Value::String(s) => match s.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" => Ok(false),
            _ => Err(SettingsError::InvalidValue(format!(
                "Cannot convert '{}' to boolean",
                s
            ))),
        },
        _ => Err(SettingsError::InvalidValue(format!(
            "Cannot convert {:?} to boolean",
            value
        ))),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Keylayout Settings
# Place this file at: ~/.config/keylayout/settings.toml

[translation]
# Dead keys start compositions; when false they type their accent directly
dead_keys = true

# Highest physical key code scanned when a layout is indexed
max_key_code = 127

# Keyboard type passed to the translator (detected if not set)
# keyboard_type = 40

[cache]
# Modifier combinations translated up front for every key
prewarm = []
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_settings_default() {
        let settings = Settings::new();
        assert!(settings.dead_keys());
        assert_eq!(settings.max_key_code(), 127);
        assert_eq!(settings.keyboard_type(), None);
        assert!(settings.prewarm().is_empty());
        assert_eq!(settings.translation_options(), TranslationOptions::default());
    }

    #[test]
    fn test_settings_from_toml() {
        let toml = r#"
[translation]
dead_keys = false
max_key_code = 80
keyboard_type = 40

[cache]
prewarm = ["shift", "option", "Shift+Option", "alt"]
"#;

        let settings = Settings::from_toml(toml).unwrap();
        assert!(!settings.dead_keys());
        assert_eq!(settings.max_key_code(), 80);
        assert_eq!(settings.keyboard_type(), Some(40));
        assert_eq!(
            settings.prewarm(),
            &[
                ModifierSet::SHIFT,
                ModifierSet::OPTION,
                ModifierSet::SHIFT | ModifierSet::OPTION
            ]
        );
    }

    #[test]
    fn test_settings_with_string_values() {
        let settings = Settings::from_toml("[translation]\ndead_keys = \"off\"\n").unwrap();
        assert!(!settings.dead_keys());
    }

    #[test]
    fn test_settings_invalid_values() {
        assert!(matches!(
            Settings::from_toml("[translation]\nmax_key_code = 300\n"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            Settings::from_toml("[translation]\ndead_keys = \"maybe\"\n"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            Settings::from_toml("[cache]\nprewarm = [\"hyper\"]\n"),
            Err(SettingsError::InvalidValue(_))
        ));
        assert!(matches!(
            Settings::from_toml("[translation"),
            Err(SettingsError::TomlParse(_))
        ));
    }

    #[test]
    fn test_default_content_parses() {
        let settings = Settings::from_toml(default_settings_content()).unwrap();
        assert_eq!(settings, Settings::new());
    }

    #[test]
    fn test_settings_file_reload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[translation]\nmax_key_code = 50").unwrap();

        let mut settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.max_key_code(), 50);
        assert_eq!(settings.source_path(), Some(file.path()));

        std::fs::write(file.path(), "[translation]\nmax_key_code = 60\n").unwrap();
        settings.reload().unwrap();
        assert_eq!(settings.max_key_code(), 60);
    }

    #[test]
    fn test_reload_without_path() {
        let mut settings = Settings::new();
        assert!(matches!(
            settings.reload(),
            Err(SettingsError::InvalidValue(_))
        ));
    }
}
