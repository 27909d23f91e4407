use std::sync::Arc;

use chrono::{DateTime, Duration, Local, LocalResult, NaiveDateTime, NaiveTime, TimeZone};
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::StorageError;
use crate::settings::{ReminderSchedule, SettingsStore};

use super::{AlarmService, Clock, ReminderNotifier};

#[derive(Debug, Error)]
pub enum ScheduleError {
    /// Exact-timer registration is not permitted right now. The desired
    /// schedule has already been persisted; retry `apply` once the
    /// permission is granted.
    #[error("exact-timer scheduling permission denied")]
    PermissionDenied,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What `apply` did with the OS timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Registered(DateTime<Local>),
    Disabled,
}

/// Computes the next wall-clock fire time: today at `at` if `now`'s
/// time-of-day is strictly before it, otherwise tomorrow at `at`. Pure
/// calendar arithmetic on local fields; a DST shift between now and the
/// fire time does not stretch or shrink the wait.
pub fn next_fire_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if now.time() < at {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Resolves a naive local timestamp to an absolute instant. Ambiguous
/// times (DST fold) take the earlier mapping; nonexistent times (DST
/// gap) skip forward until the wall clock exists again.
fn resolve_local(naive: NaiveDateTime) -> DateTime<Local> {
    let mut candidate = naive;
    loop {
        match Local.from_local_datetime(&candidate) {
            LocalResult::Single(instant) => return instant,
            LocalResult::Ambiguous(earlier, _) => return earlier,
            LocalResult::None => candidate = candidate + Duration::minutes(30),
        }
    }
}

/// Drives the single recurring reminder registration from the persisted
/// schedule. State machine over {unregistered, registered(instant)};
/// the persisted settings are the source of truth and the OS timer is
/// reconciled to them.
pub struct ReminderScheduler {
    settings: Arc<SettingsStore>,
    alarms: Arc<dyn AlarmService>,
    clock: Arc<dyn Clock>,
}

impl ReminderScheduler {
    pub fn new(
        settings: Arc<SettingsStore>,
        alarms: Arc<dyn AlarmService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            alarms,
            clock,
        }
    }

    /// The next instant the reminder would fire for `schedule`, from the
    /// injected clock.
    pub fn next_fire(&self, schedule: &ReminderSchedule) -> DateTime<Local> {
        let at = NaiveTime::from_hms_opt(schedule.hour.min(23), schedule.minute.min(59), 0)
            .expect("clamped wall-clock time is always valid");
        resolve_local(next_fire_after(self.clock.now().naive_local(), at))
    }

    /// Persists `schedule`, then reconciles the OS timer with it.
    ///
    /// The persist happens first in both branches: once it succeeds the
    /// schedule is committed, and any interruption between persisting
    /// and the OS call is repaired by the next `reconcile`. A denied
    /// permission therefore never loses the user's intent.
    pub fn apply(&self, schedule: &ReminderSchedule) -> Result<ApplyOutcome, ScheduleError> {
        self.settings.save_reminder(schedule)?;

        if !schedule.enabled {
            self.alarms.cancel();
            info!("reminder disabled");
            return Ok(ApplyOutcome::Disabled);
        }

        if !self.alarms.can_schedule_exact() {
            info!("reminder persisted but exact-timer permission is missing");
            return Err(ScheduleError::PermissionDenied);
        }

        let fire_at = self.next_fire(schedule);
        self.alarms.register(fire_at);
        debug!(hour = schedule.hour, minute = schedule.minute, %fire_at, "reminder scheduled");
        Ok(ApplyOutcome::Registered(fire_at))
    }

    /// Re-derives the registration from persisted state alone. Called on
    /// process start and after any interruption, because exact timers do
    /// not survive reboot and the OS registration may have been lost
    /// while the persisted schedule says enabled.
    pub fn reconcile(&self) -> Result<ApplyOutcome, ScheduleError> {
        let schedule = self.settings.reminder();
        self.apply(&schedule)
    }

    /// Handles a timer fire: presents the notification exactly once,
    /// then re-arms for the next day from persisted state. A one-shot
    /// exact timer does not repeat itself, so re-registration is part of
    /// handling the fire.
    pub fn handle_fire(
        &self,
        notifier: &dyn ReminderNotifier,
    ) -> Result<ApplyOutcome, ScheduleError> {
        notifier.show_reminder();
        self.reconcile()
    }
}
