use crate::catalog::KindMask;
use crate::endpoint::Credential;
use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub const DEFAULT_ON_SCREEN_TIME_MS: u64 = 2000;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PluginSettings {
    /// Overrides the plugin's default mask when set.
    pub active_kinds: Option<KindMask>,
    pub option: u32,
    pub offset_x: f64,
    pub offset_y: f64,
    pub on_screen_time_ms: u64,
    pub additional_data: String,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            active_kinds: None,
            option: 0,
            offset_x: 0.0,
            offset_y: 0.0,
            on_screen_time_ms: DEFAULT_ON_SCREEN_TIME_MS,
            additional_data: String::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub server_address: String,
    pub password: String,
    /// Whether the user's last action implies "should be connected".
    pub is_connected: bool,
    pub notification_style: String,
    pub close_on_exit: bool,
    pub first_run: bool,
    pub plugin_settings: BTreeMap<String, PluginSettings>,
    #[serde(skip)]
    pub is_preview_showing: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: crate::endpoint::DEFAULT_ADDRESS.to_string(),
            password: String::new(),
            is_connected: false,
            notification_style: crate::registry::DEFAULT_PLUGIN_ID.to_string(),
            close_on_exit: false,
            first_run: true,
            plugin_settings: BTreeMap::new(),
            is_preview_showing: false,
        }
    }
}

impl Settings {
    /// Removes per-plugin entries for plugins that no longer exist. Returns
    /// whether anything was removed.
    pub fn clear_unused_plugin_settings<'a>(
        &mut self,
        known_ids: impl IntoIterator<Item = &'a str>,
    ) -> bool {
        let known: Vec<&str> = known_ids.into_iter().collect();
        let before = self.plugin_settings.len();
        self.plugin_settings.retain(|id, _| known.contains(&id.as_str()));
        before != self.plugin_settings.len()
    }
}

/// Shared, optionally file-backed settings. Cloning yields another handle to
/// the same settings.
#[derive(Clone)]
pub struct SettingsHandle {
    inner: Arc<Mutex<Settings>>,
    path: Option<Arc<PathBuf>>,
}

impl SettingsHandle {
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            inner: Arc::new(Mutex::new(settings)),
            path: None,
        }
    }

    /// Loads settings from `path`; a missing file yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let settings = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(settings)),
            path: Some(Arc::new(path)),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref().map(PathBuf::as_path)
    }

    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(&*self.lock())?;
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Saves and logs instead of failing; persistence problems never stop the
    /// connection logic.
    pub fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "failed to save settings");
        }
    }

    pub fn read<R>(&self, f: impl FnOnce(&Settings) -> R) -> R {
        f(&self.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn snapshot(&self) -> Settings {
        self.lock().clone()
    }

    pub fn endpoint(&self) -> (String, Credential) {
        self.read(|s| (s.server_address.clone(), Credential::new(s.password.clone())))
    }

    pub fn connection_intent(&self) -> bool {
        self.read(|s| s.is_connected)
    }

    pub fn set_connection_intent(&self, connected: bool) {
        self.update(|s| s.is_connected = connected);
    }

    pub fn is_preview_showing(&self) -> bool {
        self.read(|s| s.is_preview_showing)
    }

    pub fn set_preview_showing(&self, showing: bool) {
        self.update(|s| s.is_preview_showing = showing);
    }

    pub fn plugin_settings(&self, plugin_id: &str) -> PluginSettings {
        self.read(|s| s.plugin_settings.get(plugin_id).cloned().unwrap_or_default())
    }

    pub fn active_kinds_override(&self, plugin_id: &str) -> Option<KindMask> {
        self.read(|s| {
            s.plugin_settings
                .get(plugin_id)
                .and_then(|p| p.active_kinds)
                .map(|m| KindMask::from_bits_truncate(m.bits()))
        })
    }

    pub fn set_active_kinds(&self, plugin_id: &str, kinds: Option<KindMask>) {
        self.update(|s| {
            s.plugin_settings
                .entry(plugin_id.to_string())
                .or_default()
                .active_kinds = kinds;
        });
    }

    fn lock(&self) -> MutexGuard<'_, Settings> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SettingsHandle {
    fn default() -> Self {
        Self::in_memory(Settings::default())
    }
}
