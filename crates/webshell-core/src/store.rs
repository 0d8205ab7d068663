// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Configuration store: typed key/value access with declared defaults.
//
// The store itself is a dumb map. `ShellSettings` layers the typed getters on
// top and applies the default from `ShellDefaults` whenever a key is absent
// (or holds a value of the wrong type, which is logged and ignored).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, instrument, warn};

use crate::config::{ConfigKey, ConfigValue, ShellDefaults};
use crate::convert::{Color, is_affirmative};
use crate::error::{Result, ShellError};

/// Shared, read-mostly key/value store.
///
/// Implementations must make a successful `set` durable before returning:
/// several operations restart the shell right after writing.
pub trait ConfigStore: Send + Sync {
    fn get(&self, key: ConfigKey) -> Option<ConfigValue>;

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<()>;

    /// Force any buffered state to durable storage.
    fn flush(&self) -> Result<()>;
}

/// Volatile store for tests and for the fallback path when the data
/// directory is unusable.
#[derive(Default)]
pub struct MemoryConfigStore {
    values: Mutex<BTreeMap<&'static str, ConfigValue>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key.storage_name()).cloned()
    }

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.storage_name(), value);
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

/// JSON file on disk, written through on every `set`.
///
/// Writes go to a sibling temp file which is synced and then renamed over
/// the real one, so a crash mid-write leaves the previous contents intact.
pub struct JsonFileConfigStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, ConfigValue>>,
}

impl JsonFileConfigStore {
    /// Open (or start) the store at `path`. A missing file is an empty store.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        info!(entries = values.len(), "configuration store opened");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, ConfigValue>) -> Result<()> {
        use std::io::Write;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(values)?;
        {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        debug!(entries = values.len(), "configuration persisted");
        Ok(())
    }
}

impl ConfigStore for JsonFileConfigStore {
    fn get(&self, key: ConfigKey) -> Option<ConfigValue> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.get(key.storage_name()).cloned()
    }

    fn set(&self, key: ConfigKey, value: ConfigValue) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.storage_name().to_string(), value);
        self.persist(&values)
    }

    fn flush(&self) -> Result<()> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        self.persist(&values)
    }
}

/// Typed accessor over a [`ConfigStore`] plus its declared defaults.
#[derive(Clone)]
pub struct ShellSettings {
    store: Arc<dyn ConfigStore>,
    defaults: Arc<ShellDefaults>,
}

impl ShellSettings {
    pub fn new(store: Arc<dyn ConfigStore>, defaults: ShellDefaults) -> Self {
        Self {
            store,
            defaults: Arc::new(defaults),
        }
    }

    /// Settings over a fresh in-memory store with stock defaults.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryConfigStore::new()), ShellDefaults::default())
    }

    pub fn defaults(&self) -> &ShellDefaults {
        &self.defaults
    }

    /// Stored value for `key`, or the declared default.
    pub fn value(&self, key: ConfigKey) -> ConfigValue {
        self.store
            .get(key)
            .unwrap_or_else(|| self.defaults.value_for(key))
    }

    fn string(&self, key: ConfigKey) -> String {
        match self.store.get(key) {
            Some(ConfigValue::Str(s)) => s,
            Some(other) => {
                warn!(%key, ?other, "ignoring non-string value");
                self.default_string(key)
            }
            None => self.default_string(key),
        }
    }

    fn default_string(&self, key: ConfigKey) -> String {
        self.defaults
            .value_for(key)
            .as_str()
            .map(str::to_owned)
            .unwrap_or_default()
    }

    fn flag(&self, key: ConfigKey) -> bool {
        let fallback = self.defaults.value_for(key).as_bool().unwrap_or(false);
        match self.store.get(key) {
            Some(ConfigValue::Bool(b)) => b,
            Some(other) => {
                warn!(%key, ?other, "ignoring non-boolean value");
                fallback
            }
            None => fallback,
        }
    }

    pub fn entry(&self) -> String {
        self.string(ConfigKey::Entry)
    }

    pub fn scan_action(&self) -> String {
        self.string(ConfigKey::ScanAction)
    }

    pub fn scan_extra(&self) -> String {
        self.string(ConfigKey::ScanExtra)
    }

    pub fn hardware_acceleration(&self) -> bool {
        self.flag(ConfigKey::HardwareAcceleration)
    }

    pub fn theme_color(&self) -> Color {
        match self.store.get(ConfigKey::ThemeColor) {
            Some(ConfigValue::Int(argb)) => match u32::try_from(argb) {
                Ok(argb) => Color::from_argb(argb),
                Err(_) => {
                    warn!(argb, "stored theme color out of range");
                    self.defaults.theme_color
                }
            },
            Some(other) => {
                warn!(?other, "ignoring non-integer theme color");
                self.defaults.theme_color
            }
            None => self.defaults.theme_color,
        }
    }

    pub fn action_bar_visible(&self) -> bool {
        self.flag(ConfigKey::ActionBarVisible)
    }

    pub fn setting_menu_visible(&self) -> bool {
        self.flag(ConfigKey::SettingMenuVisible)
    }

    pub fn about_url(&self) -> String {
        self.string(ConfigKey::AboutUrl)
    }

    pub fn help_url(&self) -> String {
        self.string(ConfigKey::HelpUrl)
    }

    pub fn bypass_compatibility_check(&self) -> bool {
        self.flag(ConfigKey::BypassCompatibilityCheck)
    }

    // -- Setters -------------------------------------------------------------

    pub fn set_entry(&self, url: &str) -> Result<()> {
        self.store.set(ConfigKey::Entry, ConfigValue::Str(url.into()))
    }

    pub fn set_scan_options(&self, action: &str, extra: &str) -> Result<()> {
        self.store
            .set(ConfigKey::ScanAction, ConfigValue::Str(action.into()))?;
        self.store
            .set(ConfigKey::ScanExtra, ConfigValue::Str(extra.into()))
    }

    pub fn set_hardware_acceleration(&self, enabled: bool) -> Result<()> {
        self.store
            .set(ConfigKey::HardwareAcceleration, ConfigValue::Bool(enabled))
    }

    pub fn set_theme_color(&self, color: Color) -> Result<()> {
        self.store
            .set(ConfigKey::ThemeColor, ConfigValue::Int(i64::from(color.argb())))
    }

    pub fn set_action_bar_visible(&self, visible: bool) -> Result<()> {
        self.store
            .set(ConfigKey::ActionBarVisible, ConfigValue::Bool(visible))
    }

    pub fn set_setting_menu_visible(&self, visible: bool) -> Result<()> {
        self.store
            .set(ConfigKey::SettingMenuVisible, ConfigValue::Bool(visible))
    }

    pub fn set_about_url(&self, url: &str) -> Result<()> {
        self.store.set(ConfigKey::AboutUrl, ConfigValue::Str(url.into()))
    }

    pub fn set_help_url(&self, url: &str) -> Result<()> {
        self.store.set(ConfigKey::HelpUrl, ConfigValue::Str(url.into()))
    }

    pub fn set_bypass_compatibility_check(&self, bypass: bool) -> Result<()> {
        self.store
            .set(ConfigKey::BypassCompatibilityCheck, ConfigValue::Bool(bypass))
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }

    /// Import a quick configuration document.
    ///
    /// The document is a JSON object keyed by storage names with string
    /// values. Every entry is validated before anything is written; unknown
    /// keys are skipped. Returns the number of keys applied.
    #[instrument(skip_all)]
    pub fn apply_quick_config(&self, json: &str) -> Result<usize> {
        let doc: BTreeMap<String, String> = serde_json::from_str(json)
            .map_err(|e| ShellError::Config(format!("quick config is not a string map: {e}")))?;

        let mut staged = Vec::with_capacity(doc.len());
        for (name, raw) in &doc {
            let Some(key) = ConfigKey::from_storage_name(name) else {
                warn!(key = %name, "skipping unknown quick config key");
                continue;
            };
            let value = match key {
                ConfigKey::ThemeColor => ConfigValue::Int(i64::from(Color::parse(raw)?.argb())),
                ConfigKey::HardwareAcceleration
                | ConfigKey::ActionBarVisible
                | ConfigKey::SettingMenuVisible
                | ConfigKey::BypassCompatibilityCheck => ConfigValue::Bool(is_affirmative(raw)),
                _ => ConfigValue::Str(raw.clone()),
            };
            staged.push((key, value));
        }

        for (key, value) in &staged {
            self.store.set(*key, value.clone())?;
        }
        self.store.flush()?;
        info!(applied = staged.len(), "quick config imported");
        Ok(staged.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_absent() {
        let settings = ShellSettings::in_memory();
        assert_eq!(settings.scan_action(), "com.android.server.scan");
        assert_eq!(settings.scan_extra(), "scannerdata");
        assert_eq!(settings.theme_color().to_rgb_hex(), "0x555555");
        assert!(settings.action_bar_visible());
        assert!(!settings.hardware_acceleration());
        assert_eq!(settings.about_url(), "");
    }

    #[test]
    fn wrong_type_falls_back_to_default() {
        let store = Arc::new(MemoryConfigStore::new());
        store
            .set(ConfigKey::ActionBarVisible, ConfigValue::Str("no".into()))
            .expect("set");
        store
            .set(ConfigKey::Entry, ConfigValue::Int(7))
            .expect("set");
        let settings = ShellSettings::new(store, ShellDefaults::default());
        assert!(settings.action_bar_visible());
        assert_eq!(settings.entry(), "about:blank");
    }

    #[test]
    fn theme_color_round_trips() {
        let settings = ShellSettings::in_memory();
        let color = Color::parse("#00AEEF").expect("parse");
        settings.set_theme_color(color).expect("set");
        assert_eq!(settings.theme_color(), color);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");

        {
            let store = JsonFileConfigStore::open(&path).expect("open");
            let settings = ShellSettings::new(Arc::new(store), ShellDefaults::default());
            settings.set_help_url("https://help.example").expect("set");
            settings.set_setting_menu_visible(false).expect("set");
        }

        let store = JsonFileConfigStore::open(&path).expect("reopen");
        let settings = ShellSettings::new(Arc::new(store), ShellDefaults::default());
        assert_eq!(settings.help_url(), "https://help.example");
        assert!(!settings.setting_menu_visible());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").expect("write");
        assert!(matches!(
            JsonFileConfigStore::open(&path),
            Err(ShellError::Serialization(_))
        ));
    }

    #[test]
    fn quick_config_applies_known_keys() {
        let settings = ShellSettings::in_memory();
        let applied = settings
            .apply_quick_config(
                r##"{"E":"https://app.example/","TCD":"#112233","ABV":"no","HA":"YES","USRN":"bob"}"##,
            )
            .expect("apply");
        assert_eq!(applied, 4);
        assert_eq!(settings.entry(), "https://app.example/");
        assert_eq!(settings.theme_color().to_rgb_hex(), "0x112233");
        assert!(!settings.action_bar_visible());
        assert!(settings.hardware_acceleration());
    }

    #[test]
    fn quick_config_is_all_or_nothing() {
        let settings = ShellSettings::in_memory();
        let result = settings.apply_quick_config(r#"{"E":"https://x/","TCD":"zzz"}"#);
        assert!(matches!(result, Err(ShellError::InvalidArgument(_))));
        assert_eq!(settings.entry(), "about:blank");
    }
}
