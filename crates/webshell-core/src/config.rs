// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shell configuration keys and their declared defaults.

use serde::{Deserialize, Serialize};

use crate::convert::Color;

/// Every key the bridge reads or writes in the configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    /// Entry page URL.
    Entry,
    /// Broadcast action emitted by a hardware scan head.
    ScanAction,
    /// Payload key carrying the barcode inside that broadcast.
    ScanExtra,
    /// Hardware-accelerated rendering.
    HardwareAcceleration,
    /// Action bar / status bar theme color.
    ThemeColor,
    ActionBarVisible,
    SettingMenuVisible,
    AboutUrl,
    HelpUrl,
    /// Skip the embedding runtime version check.
    BypassCompatibilityCheck,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 10] = [
        ConfigKey::Entry,
        ConfigKey::ScanAction,
        ConfigKey::ScanExtra,
        ConfigKey::HardwareAcceleration,
        ConfigKey::ThemeColor,
        ConfigKey::ActionBarVisible,
        ConfigKey::SettingMenuVisible,
        ConfigKey::AboutUrl,
        ConfigKey::HelpUrl,
        ConfigKey::BypassCompatibilityCheck,
    ];

    /// Short name used on disk and in quick configuration documents.
    pub fn storage_name(self) -> &'static str {
        match self {
            Self::Entry => "E",
            Self::ScanAction => "SA",
            Self::ScanExtra => "SE",
            Self::HardwareAcceleration => "HA",
            Self::ThemeColor => "TCD",
            Self::ActionBarVisible => "ABV",
            Self::SettingMenuVisible => "MSV",
            Self::AboutUrl => "URLA",
            Self::HelpUrl => "URLH",
            Self::BypassCompatibilityCheck => "BCC",
        }
    }

    pub fn from_storage_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.storage_name() == name)
    }
}

impl std::fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.storage_name())
    }
}

/// A typed configuration value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// Declared default for every key, applied whenever the store has no value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellDefaults {
    pub entry: String,
    pub scan_action: String,
    pub scan_extra: String,
    pub hardware_acceleration: bool,
    pub theme_color: Color,
    pub action_bar_visible: bool,
    pub setting_menu_visible: bool,
    pub about_url: String,
    pub help_url: String,
    pub bypass_compatibility_check: bool,
}

impl Default for ShellDefaults {
    fn default() -> Self {
        Self {
            entry: "about:blank".into(),
            scan_action: "com.android.server.scan".into(),
            scan_extra: "scannerdata".into(),
            hardware_acceleration: false,
            theme_color: Color::from_rgb(0x55_5555),
            action_bar_visible: true,
            setting_menu_visible: true,
            about_url: String::new(),
            help_url: String::new(),
            bypass_compatibility_check: false,
        }
    }
}

impl ShellDefaults {
    /// The default for `key`, typed the way the store holds it.
    pub fn value_for(&self, key: ConfigKey) -> ConfigValue {
        match key {
            ConfigKey::Entry => ConfigValue::Str(self.entry.clone()),
            ConfigKey::ScanAction => ConfigValue::Str(self.scan_action.clone()),
            ConfigKey::ScanExtra => ConfigValue::Str(self.scan_extra.clone()),
            ConfigKey::HardwareAcceleration => ConfigValue::Bool(self.hardware_acceleration),
            ConfigKey::ThemeColor => ConfigValue::Int(i64::from(self.theme_color.argb())),
            ConfigKey::ActionBarVisible => ConfigValue::Bool(self.action_bar_visible),
            ConfigKey::SettingMenuVisible => ConfigValue::Bool(self.setting_menu_visible),
            ConfigKey::AboutUrl => ConfigValue::Str(self.about_url.clone()),
            ConfigKey::HelpUrl => ConfigValue::Str(self.help_url.clone()),
            ConfigKey::BypassCompatibilityCheck => {
                ConfigValue::Bool(self.bypass_compatibility_check)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_names_are_unique_and_reversible() {
        let mut seen = std::collections::HashSet::new();
        for key in ConfigKey::ALL {
            assert!(seen.insert(key.storage_name()));
            assert_eq!(ConfigKey::from_storage_name(key.storage_name()), Some(key));
        }
        assert_eq!(ConfigKey::from_storage_name("USRN"), None);
    }

    #[test]
    fn default_theme_is_opaque_grey() {
        let defaults = ShellDefaults::default();
        assert_eq!(defaults.theme_color.to_rgb_hex(), "0x555555");
        assert_eq!(
            defaults.value_for(ConfigKey::ThemeColor),
            ConfigValue::Int(0xFF55_5555)
        );
    }

    #[test]
    fn untagged_values_round_trip_through_json() {
        let json = r#"[true, 42, "x"]"#;
        let values: Vec<ConfigValue> = serde_json::from_str(json).expect("parse");
        assert_eq!(
            values,
            vec![
                ConfigValue::Bool(true),
                ConfigValue::Int(42),
                ConfigValue::Str("x".into())
            ]
        );
    }
}
