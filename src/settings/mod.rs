//! Flat key/value settings table shared by the ledger preferences and
//! the reminder schedule, with startup migration of legacy values.

pub mod model;
pub mod store;

pub use model::{ReminderSchedule, ScheduleFieldError, Settings, DEFAULT_MILK_PRICE};
pub use store::SettingsStore;
