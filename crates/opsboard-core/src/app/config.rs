//! Configuration loading
//!
//! `opsboard.toml` の読み込みと検証。すべての項目に既定値があるので、
//! 空ファイルでも動きます。

use std::path::Path;

use chrono::{Duration, NaiveTime};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::RecurrenceExpander;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub recurrence: RecurrenceConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// Lifecycle timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA time zone used for calendar math and rendered dates
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Local time of day every occurrence is due (`HH:MM`)
    #[serde(default = "default_due_cutoff")]
    pub due_cutoff: String,

    /// How long before the due date the reminder fires
    #[serde(default = "default_reminder_lead_hours")]
    pub reminder_lead_hours: u32,

    /// Timer worker count
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_due_cutoff() -> String {
    "23:59".to_string()
}

fn default_reminder_lead_hours() -> u32 {
    24
}

fn default_workers() -> usize {
    4
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            due_cutoff: default_due_cutoff(),
            reminder_lead_hours: default_reminder_lead_hours(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceConfig {
    /// Upper bound on occurrences one rule may expand to
    #[serde(default = "default_max_occurrences")]
    pub max_occurrences: usize,
}

fn default_max_occurrences() -> usize {
    1000
}

impl Default for RecurrenceConfig {
    fn default() -> Self {
        Self {
            max_occurrences: default_max_occurrences(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Closing line of every message
    #[serde(default = "default_signature")]
    pub signature: String,
}

fn default_signature() -> String {
    "Operations Team".to_string()
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            signature: default_signature(),
        }
    }
}

/// Config after validation, with parsed values.
#[derive(Debug, Clone)]
pub struct Settings {
    pub timezone: Tz,
    pub due_cutoff: NaiveTime,
    pub reminder_lead: Duration,
    pub workers: usize,
    pub max_occurrences: usize,
    pub signature: String,
}

impl Settings {
    pub fn expander(&self) -> RecurrenceExpander {
        RecurrenceExpander::new(self.timezone, self.due_cutoff, self.max_occurrences)
    }
}

impl Default for Settings {
    fn default() -> Self {
        // 既定値は常に検証を通る
        Config::default().validate().unwrap_or_else(|_| Settings {
            timezone: chrono_tz::UTC,
            due_cutoff: crate::domain::expander::default_cutoff(),
            reminder_lead: Duration::hours(24),
            workers: 4,
            max_occurrences: 1000,
            signature: default_signature(),
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<Settings, ConfigError> {
        let timezone: Tz = self.schedule.timezone.parse().map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown time zone '{}'",
                self.schedule.timezone
            ))
        })?;
        let due_cutoff = NaiveTime::parse_from_str(&self.schedule.due_cutoff, "%H:%M")
            .map_err(|_| {
                ConfigError::Invalid(format!(
                    "due_cutoff must be HH:MM, got '{}'",
                    self.schedule.due_cutoff
                ))
            })?;
        if self.schedule.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        if self.recurrence.max_occurrences == 0 {
            return Err(ConfigError::Invalid(
                "max_occurrences must be at least 1".into(),
            ));
        }

        Ok(Settings {
            timezone,
            due_cutoff,
            reminder_lead: Duration::hours(i64::from(self.schedule.reminder_lead_hours)),
            workers: self.schedule.workers,
            max_occurrences: self.recurrence.max_occurrences,
            signature: self.notifications.signature.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        let settings = config.validate().unwrap();
        assert_eq!(settings.timezone, chrono_tz::UTC);
        assert_eq!(settings.due_cutoff, NaiveTime::from_hms_opt(23, 59, 0).unwrap());
        assert_eq!(settings.reminder_lead, Duration::hours(24));
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.max_occurrences, 1000);
        assert_eq!(settings.signature, "Operations Team");
    }

    #[test]
    fn sections_override_defaults() {
        let config = Config::from_toml(
            r#"
            [schedule]
            timezone = "America/New_York"
            due_cutoff = "18:00"
            reminder_lead_hours = 2

            [notifications]
            signature = "OPS-360"
            "#,
        )
        .unwrap();
        let settings = config.validate().unwrap();
        assert_eq!(settings.timezone, chrono_tz::America::New_York);
        assert_eq!(settings.due_cutoff, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(settings.reminder_lead, Duration::hours(2));
        assert_eq!(settings.workers, 4);
        assert_eq!(settings.signature, "OPS-360");
    }

    #[test]
    fn rejects_unknown_timezone() {
        let err = Config::from_toml("[schedule]\ntimezone = \"Mars/Olympus\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("Mars/Olympus")));
    }

    #[test]
    fn rejects_bad_cutoff() {
        assert!(Config::from_toml("[schedule]\ndue_cutoff = \"late\"\n").is_err());
    }

    #[test]
    fn rejects_zero_workers() {
        assert!(Config::from_toml("[schedule]\nworkers = 0\n").is_err());
    }
}
