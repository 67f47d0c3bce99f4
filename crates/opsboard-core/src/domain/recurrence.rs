//! Recurrence rules.
//!
//! `RecurrenceInput` is the loose shape a caller submits (strings, optional
//! fields); `RecurrenceRule` is the validated value object attached to a
//! project. Validation happens once, before anything is written.

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::errors::OpsError;

/// How often a rule repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" => Ok(Frequency::Yearly),
            _ => Err(OpsError::validation(format!(
                "invalid recurrence frequency type '{s}'"
            ))),
        }
    }
}

/// Which field terminates the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueType {
    After,
    Date,
}

impl FromStr for DueType {
    type Err = OpsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "after" => Ok(DueType::After),
            "date" => Ok(DueType::Date),
            _ => Err(OpsError::validation(format!("invalid due_type '{s}'"))),
        }
    }
}

/// Termination of a rule. Exactly one of "count" and "end date" exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Run exactly this many iterations.
    After(NonZeroU32),
    /// Run while the occurrence's local date is on or before this date.
    Until(NaiveDate),
}

/// Validated recurrence rule. Immutable once attached to a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    frequency: Frequency,
    interval: NonZeroU32,
    byweekday: Vec<Weekday>,
    termination: Termination,
}

impl RecurrenceRule {
    /// Build a rule, enforcing the same checks as [`RecurrenceRule::parse`].
    pub fn new(
        frequency: Frequency,
        interval: u32,
        byweekday: Vec<Weekday>,
        termination: Termination,
    ) -> Result<Self, OpsError> {
        let interval = NonZeroU32::new(interval)
            .ok_or_else(|| OpsError::validation("recurrence interval must be at least 1"))?;

        let mut days: Vec<Weekday> = Vec::with_capacity(byweekday.len());
        for day in byweekday {
            if !days.contains(&day) {
                days.push(day);
            }
        }
        if frequency == Frequency::Weekly && days.is_empty() {
            return Err(OpsError::validation(
                "weekly recurrence requires at least one weekday",
            ));
        }

        Ok(Self {
            frequency,
            interval,
            byweekday: days,
            termination,
        })
    }

    /// Single occurrence at the anchor.
    pub fn once() -> Self {
        Self {
            frequency: Frequency::Once,
            interval: NonZeroU32::MIN,
            byweekday: Vec::new(),
            termination: Termination::After(NonZeroU32::MIN),
        }
    }

    /// Validate a caller-supplied rule.
    pub fn parse(input: &RecurrenceInput) -> Result<Self, OpsError> {
        let frequency: Frequency = input.frequency.parse()?;

        let due_type = match input.due_type.as_deref() {
            Some(raw) => Some(raw.parse::<DueType>()?),
            None => None,
        };

        let termination = match (due_type, input.after, input.end_date) {
            (Some(DueType::After), Some(n), None) => NonZeroU32::new(n)
                .map(Termination::After)
                .ok_or_else(|| OpsError::validation("'after' must be at least 1"))?,
            (Some(DueType::After), None, _) => {
                return Err(OpsError::validation("due_type After requires 'after'"));
            }
            (Some(DueType::After), Some(_), Some(_)) => {
                return Err(OpsError::validation(
                    "due_type After must not carry an end date",
                ));
            }
            (Some(DueType::Date), None, Some(end)) => Termination::Until(end),
            (Some(DueType::Date), _, None) => {
                return Err(OpsError::validation("due_type Date requires 'end_date'"));
            }
            (Some(DueType::Date), Some(_), Some(_)) => {
                return Err(OpsError::validation(
                    "due_type Date must not carry 'after'",
                ));
            }
            // once は終了条件を持たなくてもよい
            (None, _, _) if frequency == Frequency::Once => Termination::After(NonZeroU32::MIN),
            (None, _, _) => return Err(OpsError::validation("due_type is required")),
        };

        let byweekday = input
            .byweekday
            .iter()
            .map(WeekdaySpec::to_weekday)
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(
            frequency,
            input.interval.unwrap_or(1),
            byweekday,
            termination,
        )
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn interval(&self) -> u32 {
        self.interval.get()
    }

    pub fn byweekday(&self) -> &[Weekday] {
        &self.byweekday
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    pub fn due_type(&self) -> DueType {
        match self.termination {
            Termination::After(_) => DueType::After,
            Termination::Until(_) => DueType::Date,
        }
    }

    /// Occurrence count for `After`, `None` for `Date`.
    pub fn after(&self) -> Option<u32> {
        match self.termination {
            Termination::After(n) => Some(n.get()),
            Termination::Until(_) => None,
        }
    }

    /// End date for `Date`, `None` for `After`.
    pub fn end_date(&self) -> Option<NaiveDate> {
        match self.termination {
            Termination::After(_) => None,
            Termination::Until(d) => Some(d),
        }
    }
}

/// A weekday as submitted: a name ("Monday", "mon") or a number where
/// Sunday is 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WeekdaySpec {
    Number(u8),
    Name(String),
}

impl WeekdaySpec {
    pub fn to_weekday(&self) -> Result<Weekday, OpsError> {
        match self {
            WeekdaySpec::Number(n) if *n < 7 => Ok(weekday_from_sunday_index(*n)),
            WeekdaySpec::Number(n) => {
                Err(OpsError::validation(format!("invalid weekday number {n}")))
            }
            WeekdaySpec::Name(name) => name
                .trim()
                .parse::<Weekday>()
                .map_err(|_| OpsError::validation(format!("invalid weekday '{name}'"))),
        }
    }
}

impl From<Weekday> for WeekdaySpec {
    fn from(day: Weekday) -> Self {
        WeekdaySpec::Name(day.to_string())
    }
}

fn weekday_from_sunday_index(n: u8) -> Weekday {
    match n {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

/// Recurrence as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrenceInput {
    pub frequency: String,
    #[serde(default)]
    pub interval: Option<u32>,
    #[serde(default)]
    pub byweekday: Vec<WeekdaySpec>,
    #[serde(default)]
    pub due_type: Option<String>,
    #[serde(default)]
    pub after: Option<u32>,
    #[serde(default, alias = "date")]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceInput {
    pub fn after(frequency: &str, interval: u32, after: u32) -> Self {
        Self {
            frequency: frequency.to_string(),
            interval: Some(interval),
            due_type: Some("After".to_string()),
            after: Some(after),
            ..Self::default()
        }
    }

    pub fn until(frequency: &str, interval: u32, end_date: NaiveDate) -> Self {
        Self {
            frequency: frequency.to_string(),
            interval: Some(interval),
            due_type: Some("Date".to_string()),
            end_date: Some(end_date),
            ..Self::default()
        }
    }

    pub fn with_weekdays(mut self, days: &[Weekday]) -> Self {
        self.byweekday = days.iter().copied().map(WeekdaySpec::from).collect();
        self
    }
}
