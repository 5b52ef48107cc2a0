use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::app_dirs::AppDirs;
use crate::error::PreferenceError;

/// Retention applied to every write unless a caller asks for another one.
pub const DEFAULT_TTL_DAYS: u32 = 365;

pub const DEFAULT_DURATION_MINUTES: u32 = 20;

/// Longest session accepted anywhere: one day.
pub const MAX_DURATION_MINUTES: u32 = 24 * 60;

pub mod keys {
    pub const DURATION_MINUTES: &str = "reso_meditation_duration_minutes";
    pub const GONG_ENABLED: &str = "reso_meditation_gong_enabled";
    pub const SHOW_PROGRESS: &str = "reso_meditation_show_progress";
    pub const SHOW_REMAINING_TIME: &str = "reso_meditation_show_remaining_time";
    pub const BLACK_SCREEN: &str = "reso_meditation_black_screen";
}

/// Persisted string key/value store.
pub trait PreferenceStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set_with_ttl(&mut self, key: &str, value: &str, ttl_days: u32) -> Result<(), PreferenceError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), PreferenceError> {
        self.set_with_ttl(key, value, DEFAULT_TTL_DAYS)
    }
}

/// User preferences, decoded from the store's strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preferences {
    pub duration_minutes: u32,
    pub gong_enabled: bool,
    pub show_progress: bool,
    pub show_remaining_time: bool,
    pub dim_screen: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            duration_minutes: DEFAULT_DURATION_MINUTES,
            gong_enabled: true,
            show_progress: true,
            show_remaining_time: true,
            dim_screen: false,
        }
    }
}

/// One persisted field of [`Preferences`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Setting {
    DurationMinutes,
    GongEnabled,
    ShowProgress,
    ShowRemainingTime,
    DimScreen,
}

impl Setting {
    pub fn key(&self) -> &'static str {
        match self {
            Setting::DurationMinutes => keys::DURATION_MINUTES,
            Setting::GongEnabled => keys::GONG_ENABLED,
            Setting::ShowProgress => keys::SHOW_PROGRESS,
            Setting::ShowRemainingTime => keys::SHOW_REMAINING_TIME,
            Setting::DimScreen => keys::BLACK_SCREEN,
        }
    }

    /// Wire encoding of this field: decimal integer or `"true"`/`"false"`.
    pub fn encode(&self, prefs: &Preferences) -> String {
        match self {
            Setting::DurationMinutes => prefs.duration_minutes.to_string(),
            Setting::GongEnabled => prefs.gong_enabled.to_string(),
            Setting::ShowProgress => prefs.show_progress.to_string(),
            Setting::ShowRemainingTime => prefs.show_remaining_time.to_string(),
            Setting::DimScreen => prefs.dim_screen.to_string(),
        }
    }
}

/// A stored duration must be a decimal integer in `1..=MAX_DURATION_MINUTES`.
pub fn parse_duration(raw: &str) -> Result<u32, PreferenceError> {
    match raw.trim().parse::<u32>() {
        Ok(minutes) if (1..=MAX_DURATION_MINUTES).contains(&minutes) => Ok(minutes),
        _ => Err(PreferenceError::InvalidValue {
            key: keys::DURATION_MINUTES.to_string(),
            value: raw.to_string(),
        }),
    }
}

/// Anything other than `"true"` reads as false.
pub fn parse_flag(raw: &str) -> bool {
    raw == "true"
}

impl Preferences {
    /// Reads every field, falling back to the default for absent or corrupt values.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        let defaults = Self::default();

        let duration_minutes = match store.get(keys::DURATION_MINUTES) {
            Some(raw) => parse_duration(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "falling back to default duration");
                defaults.duration_minutes
            }),
            None => defaults.duration_minutes,
        };
        let flag = |key: &str, default: bool| store.get(key).map_or(default, |raw| parse_flag(&raw));

        Self {
            duration_minutes,
            gong_enabled: flag(keys::GONG_ENABLED, defaults.gong_enabled),
            show_progress: flag(keys::SHOW_PROGRESS, defaults.show_progress),
            show_remaining_time: flag(keys::SHOW_REMAINING_TIME, defaults.show_remaining_time),
            dim_screen: flag(keys::BLACK_SCREEN, defaults.dim_screen),
        }
    }

    pub fn save_setting(
        &self,
        setting: Setting,
        store: &mut dyn PreferenceStore,
    ) -> Result<(), PreferenceError> {
        store.set(setting.key(), &setting.encode(self))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredValue {
    value: String,
    expires_at: DateTime<Utc>,
}

/// JSON file backed store. Read once on open, rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredValue>,
}

impl FilePreferenceStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::preferences_path().unwrap_or_else(|| PathBuf::from("reso_preferences.json"));
        Self::with_path(path)
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        let path = p.as_ref().to_path_buf();
        let entries = Self::read_entries(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(path: &Path) -> BTreeMap<String, StoredValue> {
        let Ok(bytes) = fs::read(path) else {
            return BTreeMap::new();
        };
        match serde_json::from_slice::<BTreeMap<String, StoredValue>>(&bytes) {
            Ok(mut entries) => {
                let now = Utc::now();
                entries.retain(|_, stored| stored.expires_at > now);
                entries
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable preference file");
                BTreeMap::new()
            }
        }
    }

    fn write_entries(&self) -> Result<(), PreferenceError> {
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let data = serde_json::to_vec_pretty(&self.entries)?;
        fs::write(&self.path, data).map_err(io_err)
    }
}

impl PreferenceStore for FilePreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .get(key)
            .filter(|stored| stored.expires_at > Utc::now())
            .map(|stored| stored.value.clone())
    }

    fn set_with_ttl(&mut self, key: &str, value: &str, ttl_days: u32) -> Result<(), PreferenceError> {
        let stored = StoredValue {
            value: value.to_string(),
            expires_at: Utc::now() + ChronoDuration::days(i64::from(ttl_days)),
        };
        self.entries.insert(key.to_string(), stored);
        self.write_entries()
    }
}

/// In-memory store. Clones share the same entries, so a test can keep a
/// handle after boxing one into the controller.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    entries: Rc<RefCell<HashMap<String, (String, u32)>>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (key, value) in entries {
            store
                .entries
                .borrow_mut()
                .insert(key.to_string(), (value.to_string(), DEFAULT_TTL_DAYS));
        }
        store
    }

    pub fn ttl_days(&self, key: &str) -> Option<u32> {
        self.entries.borrow().get(key).map(|(_, ttl)| *ttl)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).map(|(value, _)| value.clone())
    }

    fn set_with_ttl(&mut self, key: &str, value: &str, ttl_days: u32) -> Result<(), PreferenceError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), (value.to_string(), ttl_days));
        Ok(())
    }
}
