use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_MILK_PRICE: f64 = 35.0;
pub const DEFAULT_REMINDER_HOUR: u32 = 20;
pub const DEFAULT_REMINDER_MINUTE: u32 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleFieldError {
    #[error("hour must be between 0 and 23, got {0}")]
    Hour(u32),
    #[error("minute must be between 0 and 59, got {0}")]
    Minute(u32),
}

/// Desired daily reminder schedule. Hour and minute always hold a valid
/// wall-clock time; when `enabled` is false no OS timer may stay
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSchedule {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
}

impl ReminderSchedule {
    pub fn new(enabled: bool, hour: u32, minute: u32) -> Result<Self, ScheduleFieldError> {
        if hour > 23 {
            return Err(ScheduleFieldError::Hour(hour));
        }
        if minute > 59 {
            return Err(ScheduleFieldError::Minute(minute));
        }
        Ok(Self {
            enabled,
            hour,
            minute,
        })
    }
}

impl Default for ReminderSchedule {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: DEFAULT_REMINDER_HOUR,
            minute: DEFAULT_REMINDER_MINUTE,
        }
    }
}

/// The full settings table. Field names double as the on-disk keys, so
/// they match the original preference store of the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "Settings::default_reminder_enabled")]
    pub reminder_enabled: bool,
    #[serde(default = "Settings::default_reminder_hour")]
    pub reminder_hour: u32,
    #[serde(default = "Settings::default_reminder_minute")]
    pub reminder_minute: u32,
    #[serde(default = "Settings::default_milk_price")]
    pub milk_price: f64,
    #[serde(default)]
    pub onboarding_done: bool,
    #[serde(default)]
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminder_enabled: Self::default_reminder_enabled(),
            reminder_hour: Self::default_reminder_hour(),
            reminder_minute: Self::default_reminder_minute(),
            milk_price: Self::default_milk_price(),
            onboarding_done: false,
            dark_mode: false,
        }
    }
}

impl Settings {
    pub fn default_reminder_enabled() -> bool {
        true
    }

    pub fn default_reminder_hour() -> u32 {
        DEFAULT_REMINDER_HOUR
    }

    pub fn default_reminder_minute() -> u32 {
        DEFAULT_REMINDER_MINUTE
    }

    pub fn default_milk_price() -> f64 {
        DEFAULT_MILK_PRICE
    }

    pub fn reminder(&self) -> ReminderSchedule {
        ReminderSchedule {
            enabled: self.reminder_enabled,
            hour: self.reminder_hour,
            minute: self.reminder_minute,
        }
    }

    /// Replaces values outside their valid domain with defaults.
    /// Validation problems in stored settings are corrected silently, a
    /// crash is never the answer to a bad preference file.
    pub fn normalize(&mut self) {
        if self.reminder_hour > 23 {
            warn!(hour = self.reminder_hour, "stored reminder hour out of range, using default");
            self.reminder_hour = Self::default_reminder_hour();
        }
        if self.reminder_minute > 59 {
            warn!(
                minute = self.reminder_minute,
                "stored reminder minute out of range, using default"
            );
            self.reminder_minute = Self::default_reminder_minute();
        }
        if !self.milk_price.is_finite() || self.milk_price <= 0.0 {
            warn!(price = self.milk_price, "stored milk price invalid, using default");
            self.milk_price = Self::default_milk_price();
        }
    }
}
