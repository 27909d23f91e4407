use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};

use milk_core::ledger::EntryStore;
use milk_core::reminder::{AlarmService, Clock, ReminderNotifier};
use milk_core::service::MilkService;
use milk_core::settings::SettingsStore;
use milk_core::storage::JsonEntryStorage;

/// Timer collaborator double: records the single registration and lets
/// tests flip the exact-alarm permission.
#[derive(Default)]
pub struct ManualAlarmService {
    denied: AtomicBool,
    registered: Mutex<Option<DateTime<Local>>>,
    cancels: AtomicUsize,
}

impl ManualAlarmService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny_exact(&self, denied: bool) {
        self.denied.store(denied, Ordering::SeqCst);
    }

    pub fn registered_at(&self) -> Option<DateTime<Local>> {
        *self.registered.lock().unwrap()
    }

    pub fn cancel_count(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }
}

impl AlarmService for ManualAlarmService {
    fn can_schedule_exact(&self) -> bool {
        !self.denied.load(Ordering::SeqCst)
    }

    fn register(&self, fire_at: DateTime<Local>) {
        *self.registered.lock().unwrap() = Some(fire_at);
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        *self.registered.lock().unwrap() = None;
    }
}

/// Clock pinned to a fixed local timestamp.
pub struct FixedClock {
    now: DateTime<Local>,
}

impl FixedClock {
    pub fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Self {
        Self {
            now: Local.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap(),
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.now
    }
}

#[derive(Default)]
pub struct CountingNotifier {
    fires: AtomicUsize,
}

impl CountingNotifier {
    pub fn count(&self) -> usize {
        self.fires.load(Ordering::SeqCst)
    }
}

impl ReminderNotifier for CountingNotifier {
    fn show_reminder(&self) {
        self.fires.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds a full service over a temp data dir, handing back the pieces
/// tests need to poke at.
pub fn service_in(
    dir: &std::path::Path,
    alarms: Arc<ManualAlarmService>,
    clock: Arc<dyn Clock>,
) -> MilkService {
    let entries = Arc::new(
        EntryStore::open(Box::new(JsonEntryStorage::new(dir.join("entries.json")))).unwrap(),
    );
    let settings = Arc::new(SettingsStore::open(dir.join("settings.json")).unwrap());
    MilkService::new(entries, settings, alarms, clock)
}
