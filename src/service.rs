//! The facade the UI layer talks to: injected store handles, the
//! reminder scheduler, and the interchange operations behind one API.

use std::sync::{mpsc::Receiver, Arc};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

use crate::errors::StorageError;
use crate::ledger::{summarize, EntryError, EntryStore, MilkEntry, MonthlySummary};
use crate::reminder::{
    AlarmService, ApplyOutcome, Clock, ReminderNotifier, ReminderScheduler, ScheduleError,
};
use crate::settings::{ReminderSchedule, ScheduleFieldError, Settings, SettingsStore};
use crate::transfer::{self, TransferError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error(transparent)]
    ScheduleField(#[from] ScheduleFieldError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Application service over the two stores and the scheduler. All
/// collaborators are injected; nothing global.
pub struct MilkService {
    entries: Arc<EntryStore>,
    settings: Arc<SettingsStore>,
    scheduler: ReminderScheduler,
    clock: Arc<dyn Clock>,
}

impl MilkService {
    pub fn new(
        entries: Arc<EntryStore>,
        settings: Arc<SettingsStore>,
        alarms: Arc<dyn AlarmService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let scheduler = ReminderScheduler::new(settings.clone(), alarms, clock.clone());
        Self {
            entries,
            settings,
            scheduler,
            clock,
        }
    }

    // ----- ledger -----

    pub fn upsert_entry(
        &self,
        date: NaiveDate,
        quantity: f64,
        is_borrowed: bool,
    ) -> ServiceResult<MilkEntry> {
        let entry = MilkEntry::new(date, quantity, is_borrowed)?;
        self.entries.upsert(entry.clone())?;
        Ok(entry)
    }

    pub fn delete_entry(&self, date: NaiveDate) -> ServiceResult<()> {
        self.entries.delete(date)?;
        Ok(())
    }

    pub fn entry(&self, date: NaiveDate) -> Option<MilkEntry> {
        self.entries.entry(date)
    }

    pub fn entries(&self) -> Vec<MilkEntry> {
        self.entries.entries()
    }

    pub fn observe_entries(&self) -> Receiver<Vec<MilkEntry>> {
        self.entries.subscribe()
    }

    /// Summary of `(year, month)` at the currently stored price. The
    /// price applies at read time, so editing it re-prices past months.
    pub fn month_summary(&self, year: i32, month: u32) -> MonthlySummary {
        summarize(&self.entries.entries(), year, month, self.settings.price())
    }

    /// Summary for the month containing today.
    pub fn current_month_summary(&self) -> MonthlySummary {
        use chrono::Datelike;
        let today = self.clock.today();
        self.month_summary(today.year(), today.month())
    }

    // ----- settings -----

    pub fn price(&self) -> f64 {
        self.settings.price()
    }

    /// Stores a new per-litre price. A non-finite or non-positive input
    /// is a validation error and silently becomes the default price.
    /// Returns the value actually stored.
    pub fn set_price(&self, price: f64) -> ServiceResult<f64> {
        let effective = if price.is_finite() && price > 0.0 {
            price
        } else {
            warn!(price, "rejected milk price, storing default instead");
            Settings::default_milk_price()
        };
        self.settings.set_price(effective)?;
        Ok(effective)
    }

    pub fn dark_mode(&self) -> bool {
        self.settings.dark_mode()
    }

    pub fn set_dark_mode(&self, dark_mode: bool) -> ServiceResult<()> {
        self.settings.set_dark_mode(dark_mode)?;
        Ok(())
    }

    pub fn onboarding_done(&self) -> bool {
        self.settings.onboarding_done()
    }

    pub fn complete_onboarding(&self) -> ServiceResult<()> {
        self.settings.complete_onboarding()?;
        Ok(())
    }

    pub fn observe_settings(&self) -> Receiver<Settings> {
        self.settings.subscribe()
    }

    pub fn observe_price(&self) -> Receiver<f64> {
        self.settings.subscribe_price()
    }

    pub fn observe_reminder(&self) -> Receiver<ReminderSchedule> {
        self.settings.subscribe_reminder()
    }

    // ----- reminder -----

    pub fn reminder(&self) -> ReminderSchedule {
        self.settings.reminder()
    }

    /// Validates and applies a new reminder schedule; see
    /// [`ReminderScheduler::apply`] for the persistence-first contract.
    pub fn set_reminder(
        &self,
        enabled: bool,
        hour: u32,
        minute: u32,
    ) -> ServiceResult<ApplyOutcome> {
        let schedule = ReminderSchedule::new(enabled, hour, minute)?;
        Ok(self.scheduler.apply(&schedule)?)
    }

    /// Reconciles the OS timer with the persisted schedule; run this on
    /// every process start.
    pub fn reconcile_reminder(&self) -> ServiceResult<ApplyOutcome> {
        Ok(self.scheduler.reconcile()?)
    }

    /// Entry point for the timer-fired path: notify once, re-arm.
    pub fn handle_reminder_fired(
        &self,
        notifier: &dyn ReminderNotifier,
    ) -> ServiceResult<ApplyOutcome> {
        Ok(self.scheduler.handle_fire(notifier)?)
    }

    // ----- interchange -----

    /// Serializes the full entry set as a version-1 export document.
    pub fn export_json(&self) -> ServiceResult<String> {
        let document = transfer::export_document(self.entries.entries(), self.clock.today());
        Ok(transfer::to_json(&document)?)
    }

    /// Imports an export document into the ledger. The whole document is
    /// validated first and applied as one write; on any error zero
    /// entries are applied. Returns how many entries were imported.
    pub fn import_json(&self, input: &str) -> ServiceResult<usize> {
        let entries = transfer::parse_document(input)?;
        Ok(self.entries.upsert_many(entries)?)
    }
}
