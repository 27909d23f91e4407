//! Daily reminder scheduling: wall-clock time math, the OS timer seam,
//! and the reconcile/re-arm protocol that keeps the persisted schedule
//! and the actual registration in agreement.

pub mod alarm;
pub mod clock;
pub mod scheduler;

pub use alarm::{AlarmService, LogAlarmService, ReminderNotifier};
pub use clock::{Clock, SystemClock};
pub use scheduler::{next_fire_after, ApplyOutcome, ReminderScheduler, ScheduleError};
