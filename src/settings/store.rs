use std::path::{Path, PathBuf};
use std::sync::{
    mpsc::{self, Receiver, Sender},
    Mutex,
};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::StorageError;
use crate::storage::write_atomic;

use super::model::{ReminderSchedule, Settings};

const MILK_PRICE_KEY: &str = "milk_price";

/// Classification of the stored milk price before typed consumers see
/// it. An earlier release wrote the price as text, so the raw value has
/// to be inspected before deserialization can be trusted.
#[derive(Debug, Clone, PartialEq)]
enum StoredPrice {
    Valid(f64),
    Legacy(String),
    Absent,
}

fn classify_price(map: &Map<String, Value>) -> StoredPrice {
    match map.get(MILK_PRICE_KEY) {
        Some(Value::Number(n)) => StoredPrice::Valid(n.as_f64().unwrap_or(0.0)),
        Some(Value::String(raw)) => StoredPrice::Legacy(raw.clone()),
        Some(_) | None => StoredPrice::Absent,
    }
}

/// Maps a legacy text price onto the canonical numeric representation,
/// or removes it when unparseable. Returns true when the map changed.
fn migrate_legacy_price(map: &mut Map<String, Value>) -> bool {
    let raw = match classify_price(map) {
        StoredPrice::Legacy(raw) => raw,
        StoredPrice::Valid(price) => {
            debug!(price, "milk price already stored numerically");
            return false;
        }
        StoredPrice::Absent => {
            // A null or otherwise mistyped value is as unusable as
            // unparseable text; strip it so readers get the default.
            if map.contains_key(MILK_PRICE_KEY) {
                map.remove(MILK_PRICE_KEY);
                return true;
            }
            return false;
        }
    };
    map.remove(MILK_PRICE_KEY);
    match raw.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => {
            info!(price = parsed, "migrated legacy text milk price");
            if let Some(number) = serde_json::Number::from_f64(parsed) {
                map.insert(MILK_PRICE_KEY.to_string(), Value::Number(number));
            }
        }
        _ => {
            warn!(raw = %raw, "dropped unparseable legacy milk price");
        }
    }
    true
}

/// Reads one key, ignoring values of the wrong shape so a damaged file
/// degrades to defaults instead of refusing to open.
fn lenient_key<T: serde::de::DeserializeOwned>(map: &Map<String, Value>, key: &str) -> Option<T> {
    let value = map.get(key)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            warn!(key, "stored settings value has the wrong type, using default");
            None
        }
    }
}

/// Durable settings table. Reads always succeed by falling back to
/// defaults; writes hit disk before the in-memory state and the
/// subscribers observe them. Writes to the same store apply in issue
/// order (one mutex guards both the file and the state).
pub struct SettingsStore {
    path: PathBuf,
    state: Mutex<Settings>,
    watchers: Mutex<Vec<Sender<Settings>>>,
    price_watchers: Mutex<Vec<Sender<f64>>>,
    reminder_watchers: Mutex<Vec<Sender<ReminderSchedule>>>,
}

impl SettingsStore {
    /// Opens the settings file, running the legacy-price cleanup before
    /// any value is handed out. The cleaned file is written back only
    /// when the migration changed something.
    pub fn open(path: PathBuf) -> Result<Self, StorageError> {
        let mut map = Self::load_raw(&path)?;
        if migrate_legacy_price(&mut map) {
            let json = serde_json::to_string_pretty(&Value::Object(map.clone()))
                .map_err(|err| StorageError::Serde(err.to_string()))?;
            write_atomic(&path, &json)?;
        }
        let mut settings = Settings {
            reminder_enabled: lenient_key(&map, "reminder_enabled")
                .unwrap_or_else(Settings::default_reminder_enabled),
            reminder_hour: lenient_key(&map, "reminder_hour")
                .unwrap_or_else(Settings::default_reminder_hour),
            reminder_minute: lenient_key(&map, "reminder_minute")
                .unwrap_or_else(Settings::default_reminder_minute),
            milk_price: lenient_key(&map, MILK_PRICE_KEY)
                .unwrap_or_else(Settings::default_milk_price),
            onboarding_done: lenient_key(&map, "onboarding_done").unwrap_or(false),
            dark_mode: lenient_key(&map, "dark_mode").unwrap_or(false),
        };
        settings.normalize();
        Ok(Self {
            path,
            state: Mutex::new(settings),
            watchers: Mutex::new(Vec::new()),
            price_watchers: Mutex::new(Vec::new()),
            reminder_watchers: Mutex::new(Vec::new()),
        })
    }

    fn load_raw(path: &Path) -> Result<Map<String, Value>, StorageError> {
        if !path.exists() {
            return Ok(Map::new());
        }
        let data = std::fs::read_to_string(path)?;
        match serde_json::from_str::<Value>(&data) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!(path = %path.display(), "settings file unreadable, starting from defaults");
                Ok(Map::new())
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current snapshot of every key.
    pub fn settings(&self) -> Settings {
        self.state.lock().expect("settings lock poisoned").clone()
    }

    pub fn reminder(&self) -> ReminderSchedule {
        self.settings().reminder()
    }

    pub fn price(&self) -> f64 {
        self.settings().milk_price
    }

    pub fn dark_mode(&self) -> bool {
        self.settings().dark_mode
    }

    pub fn onboarding_done(&self) -> bool {
        self.settings().onboarding_done
    }

    pub fn save_reminder(&self, schedule: &ReminderSchedule) -> Result<(), StorageError> {
        self.update(|settings| {
            settings.reminder_enabled = schedule.enabled;
            settings.reminder_hour = schedule.hour;
            settings.reminder_minute = schedule.minute;
        })
    }

    pub fn set_price(&self, price: f64) -> Result<(), StorageError> {
        self.update(|settings| settings.milk_price = price)
    }

    pub fn set_dark_mode(&self, dark_mode: bool) -> Result<(), StorageError> {
        self.update(|settings| settings.dark_mode = dark_mode)
    }

    /// Marks first-run setup as finished. The flag only ever moves to
    /// true; there is no way back.
    pub fn complete_onboarding(&self) -> Result<(), StorageError> {
        self.update(|settings| settings.onboarding_done = true)
    }

    /// Registers an observer; the current snapshot arrives immediately
    /// and every committed write delivers a fresh one.
    pub fn subscribe(&self) -> Receiver<Settings> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.settings());
        self.watchers
            .lock()
            .expect("settings watcher lock poisoned")
            .push(tx);
        rx
    }

    /// Price-only view of [`subscribe`](Self::subscribe); re-emits the
    /// current price after every committed write to the table.
    pub fn subscribe_price(&self) -> Receiver<f64> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.price());
        self.price_watchers
            .lock()
            .expect("settings watcher lock poisoned")
            .push(tx);
        rx
    }

    /// Reminder-schedule view of [`subscribe`](Self::subscribe).
    pub fn subscribe_reminder(&self) -> Receiver<ReminderSchedule> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(self.reminder());
        self.reminder_watchers
            .lock()
            .expect("settings watcher lock poisoned")
            .push(tx);
        rx
    }

    fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<(), StorageError> {
        let mut guard = self.state.lock().expect("settings lock poisoned");
        let mut next = guard.clone();
        apply(&mut next);
        self.persist(&next)?;
        *guard = next.clone();
        drop(guard);
        self.notify(next);
        Ok(())
    }

    fn persist(&self, settings: &Settings) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(settings)
            .map_err(|err| StorageError::Serde(err.to_string()))?;
        write_atomic(&self.path, &json)
    }

    fn notify(&self, snapshot: Settings) {
        let mut price_watchers = self
            .price_watchers
            .lock()
            .expect("settings watcher lock poisoned");
        price_watchers.retain(|tx| tx.send(snapshot.milk_price).is_ok());
        drop(price_watchers);

        let mut reminder_watchers = self
            .reminder_watchers
            .lock()
            .expect("settings watcher lock poisoned");
        reminder_watchers.retain(|tx| tx.send(snapshot.reminder()).is_ok());
        drop(reminder_watchers);

        let mut watchers = self
            .watchers
            .lock()
            .expect("settings watcher lock poisoned");
        watchers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn settings_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("settings.json")
    }

    #[test]
    fn first_open_yields_defaults() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(settings_path(&dir)).unwrap();
        assert_eq!(store.settings(), Settings::default());
    }

    #[test]
    fn legacy_text_price_is_rewritten_as_number() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        std::fs::write(&path, r#"{"milk_price": "42.5"}"#).unwrap();

        let store = SettingsStore::open(path.clone()).unwrap();
        assert_eq!(store.price(), 42.5);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["milk_price"], Value::from(42.5));
    }

    #[test]
    fn unparseable_legacy_price_falls_back_to_default() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        std::fs::write(&path, r#"{"milk_price": "abc"}"#).unwrap();

        let store = SettingsStore::open(path.clone()).unwrap();
        assert_eq!(store.price(), 35.0);

        let raw: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("milk_price").is_none());
    }

    #[test]
    fn numeric_price_is_left_untouched() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        std::fs::write(&path, r#"{"milk_price": 41.0, "dark_mode": true}"#).unwrap();

        let store = SettingsStore::open(path).unwrap();
        assert_eq!(store.price(), 41.0);
        assert!(store.dark_mode());
    }

    #[test]
    fn wrong_typed_keys_degrade_to_defaults() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        std::fs::write(&path, r#"{"reminder_hour": "eight", "dark_mode": 3}"#).unwrap();

        let store = SettingsStore::open(path).unwrap();
        assert_eq!(store.settings().reminder_hour, 20);
        assert!(!store.dark_mode());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = settings_path(&dir);
        {
            let store = SettingsStore::open(path.clone()).unwrap();
            store
                .save_reminder(&ReminderSchedule::new(false, 7, 30).unwrap())
                .unwrap();
            store.set_price(50.0).unwrap();
            store.complete_onboarding().unwrap();
        }
        let store = SettingsStore::open(path).unwrap();
        let reminder = store.reminder();
        assert!(!reminder.enabled);
        assert_eq!((reminder.hour, reminder.minute), (7, 30));
        assert_eq!(store.price(), 50.0);
        assert!(store.onboarding_done());
    }

    #[test]
    fn subscribers_observe_writes() {
        let dir = tempdir().unwrap();
        let store = SettingsStore::open(settings_path(&dir)).unwrap();
        let rx = store.subscribe();
        assert_eq!(rx.recv().unwrap(), Settings::default());

        store.set_dark_mode(true).unwrap();
        assert!(rx.recv().unwrap().dark_mode);
    }
}
