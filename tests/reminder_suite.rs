use std::sync::Arc;

use chrono::{Datelike, Timelike};
use tempfile::tempdir;

use milk_core::reminder::ApplyOutcome;
use milk_core::service::ServiceError;
use milk_core::settings::SettingsStore;

mod common;
use common::{service_in, CountingNotifier, FixedClock, ManualAlarmService};

#[test]
fn enabling_registers_the_next_fire_instant() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);

    let outcome = service.set_reminder(true, 20, 0).unwrap();
    let fire_at = match outcome {
        ApplyOutcome::Registered(fire_at) => fire_at,
        other => panic!("expected a registration, got {other:?}"),
    };
    assert_eq!((fire_at.day(), fire_at.hour(), fire_at.minute()), (1, 20, 0));
    assert_eq!(alarms.registered_at(), Some(fire_at));
}

#[test]
fn past_fire_time_rolls_to_tomorrow() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 20, 1));
    let service = service_in(dir.path(), alarms.clone(), clock);

    match service.set_reminder(true, 20, 0).unwrap() {
        ApplyOutcome::Registered(fire_at) => {
            assert_eq!((fire_at.day(), fire_at.hour()), (2, 20));
        }
        other => panic!("expected a registration, got {other:?}"),
    }
}

#[test]
fn disabling_cancels_and_persists() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);

    service.set_reminder(true, 20, 0).unwrap();
    assert!(alarms.registered_at().is_some());

    let outcome = service.set_reminder(false, 20, 0).unwrap();
    assert_eq!(outcome, ApplyOutcome::Disabled);
    assert!(alarms.registered_at().is_none());
    assert!(!service.reminder().enabled);

    // Disabling again is a harmless no-op.
    service.set_reminder(false, 20, 0).unwrap();
    assert!(alarms.cancel_count() >= 2);
}

#[test]
fn permission_denial_keeps_the_persisted_schedule() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    alarms.deny_exact(true);
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);

    let err = service.set_reminder(true, 21, 30).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Schedule(milk_core::reminder::ScheduleError::PermissionDenied)
    ));
    assert!(alarms.registered_at().is_none());

    // Intent survived the denial.
    let persisted = service.reminder();
    assert!(persisted.enabled);
    assert_eq!((persisted.hour, persisted.minute), (21, 30));

    // Granting the permission and retrying completes the registration.
    alarms.deny_exact(false);
    match service.reconcile_reminder().unwrap() {
        ApplyOutcome::Registered(fire_at) => {
            assert_eq!((fire_at.hour(), fire_at.minute()), (21, 30));
        }
        other => panic!("expected a registration, got {other:?}"),
    }
}

#[test]
fn reconcile_restores_registration_after_restart() {
    let dir = tempdir().unwrap();
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    {
        let alarms = Arc::new(ManualAlarmService::new());
        let service = service_in(dir.path(), alarms, clock.clone());
        service.set_reminder(true, 20, 0).unwrap();
    }

    // Fresh alarm service: the OS forgot the registration over a reboot.
    let alarms = Arc::new(ManualAlarmService::new());
    let service = service_in(dir.path(), alarms.clone(), clock);
    assert!(alarms.registered_at().is_none());

    service.reconcile_reminder().unwrap();
    assert!(alarms.registered_at().is_some());
}

#[test]
fn reconcile_of_a_disabled_schedule_stays_unregistered() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);

    service.set_reminder(false, 20, 0).unwrap();
    let outcome = service.reconcile_reminder().unwrap();
    assert_eq!(outcome, ApplyOutcome::Disabled);
    assert!(alarms.registered_at().is_none());
}

#[test]
fn firing_notifies_once_and_rearms_for_tomorrow() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    // Exactly at the scheduled time, as the OS timer would deliver it.
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 20, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);
    service.set_reminder(true, 20, 0).unwrap();

    let notifier = CountingNotifier::default();
    let outcome = service.handle_reminder_fired(&notifier).unwrap();

    assert_eq!(notifier.count(), 1);
    match outcome {
        ApplyOutcome::Registered(fire_at) => {
            assert_eq!((fire_at.day(), fire_at.hour(), fire_at.minute()), (2, 20, 0));
        }
        other => panic!("expected a registration, got {other:?}"),
    }
    assert_eq!(alarms.registered_at().map(|t| t.day()), Some(2));
}

#[test]
fn invalid_schedule_fields_are_rejected() {
    let dir = tempdir().unwrap();
    let alarms = Arc::new(ManualAlarmService::new());
    let clock = Arc::new(FixedClock::at(2024, 4, 1, 19, 0));
    let service = service_in(dir.path(), alarms.clone(), clock);

    assert!(service.set_reminder(true, 24, 0).is_err());
    assert!(service.set_reminder(true, 20, 60).is_err());
    assert!(alarms.registered_at().is_none());
}

#[test]
fn schedule_defaults_to_eight_pm_enabled() {
    let dir = tempdir().unwrap();
    let store = SettingsStore::open(dir.path().join("settings.json")).unwrap();
    let schedule = store.reminder();
    assert!(schedule.enabled);
    assert_eq!((schedule.hour, schedule.minute), (20, 0));
}
