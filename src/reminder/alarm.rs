use std::sync::Mutex;

use chrono::{DateTime, Local};
use tracing::info;

/// The OS exact-timer collaborator. One callback identity, so at most
/// one registration is active at a time; registering again replaces it.
///
/// Platforms that gate exact timers behind a runtime permission report
/// that through `can_schedule_exact`; which OS versions need the gate is
/// the platform's concern, not the scheduler's.
pub trait AlarmService: Send + Sync {
    /// Whether exact-timer registration is currently permitted.
    fn can_schedule_exact(&self) -> bool;

    /// Requests a one-shot registration at `fire_at`, replacing any
    /// existing one.
    fn register(&self, fire_at: DateTime<Local>);

    /// Cancels the registration if one exists. Cancelling when nothing
    /// is registered is a success no-op.
    fn cancel(&self);
}

/// Notification presentation boundary: shows the record-today's-entry
/// prompt. Called exactly once per timer fire.
pub trait ReminderNotifier {
    fn show_reminder(&self);
}

/// In-process stand-in for the platform timer service. Keeps the single
/// registration in memory and logs transitions; real platforms supply
/// their own implementation of [`AlarmService`].
#[derive(Debug, Default)]
pub struct LogAlarmService {
    registered: Mutex<Option<DateTime<Local>>>,
}

impl LogAlarmService {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently registered fire instant, if any.
    pub fn registered_at(&self) -> Option<DateTime<Local>> {
        *self.registered.lock().expect("alarm registration lock poisoned")
    }
}

impl AlarmService for LogAlarmService {
    fn can_schedule_exact(&self) -> bool {
        true
    }

    fn register(&self, fire_at: DateTime<Local>) {
        let mut slot = self.registered.lock().expect("alarm registration lock poisoned");
        *slot = Some(fire_at);
        info!(fire_at = %fire_at, "reminder timer registered");
    }

    fn cancel(&self) {
        let mut slot = self.registered.lock().expect("alarm registration lock poisoned");
        if slot.take().is_some() {
            info!("reminder timer cancelled");
        }
    }
}
