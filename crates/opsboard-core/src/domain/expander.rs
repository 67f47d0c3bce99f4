//! RecurrenceExpander: rule + anchor → concrete (start, due) occurrences.
//!
//! Pure and deterministic. Calendar arithmetic happens on the local wall
//! clock of the configured time zone; results are returned in UTC.

use chrono::{
    DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeZone, Utc,
};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::errors::OpsError;
use super::recurrence::{Frequency, RecurrenceRule, Termination};

/// One concrete (start, due) pair. `start <= due` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occurrence {
    pub start: DateTime<Utc>,
    pub due: DateTime<Utc>,
}

/// Expands rules in a fixed time zone with a fixed due cutoff.
#[derive(Debug, Clone)]
pub struct RecurrenceExpander {
    tz: Tz,
    cutoff: NaiveTime,
    max_occurrences: usize,
}

impl Default for RecurrenceExpander {
    fn default() -> Self {
        Self::new(chrono_tz::UTC, default_cutoff(), 1000)
    }
}

/// 23:59, the time of day every occurrence is due.
pub fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

impl RecurrenceExpander {
    pub fn new(tz: Tz, cutoff: NaiveTime, max_occurrences: usize) -> Self {
        Self {
            tz,
            cutoff,
            max_occurrences,
        }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Expand `rule` starting at `anchor`.
    ///
    /// Fails only when the rule would produce more than `max_occurrences`.
    pub fn expand(
        &self,
        rule: &RecurrenceRule,
        anchor: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, OpsError> {
        let local = anchor.with_timezone(&self.tz).naive_local();
        let mut out = Vec::new();

        match rule.frequency() {
            Frequency::Once => {
                out.push(self.occurrence(local, local.date()));
            }
            Frequency::Daily => {
                let step = u64::from(rule.interval());
                self.walk(rule, &mut out, |i| local.checked_add_days(Days::new(i * step)))?;
            }
            Frequency::Monthly => {
                let step = rule.interval();
                self.walk(rule, &mut out, |i| {
                    let months = u32::try_from(i).ok()?.checked_mul(step)?;
                    local.checked_add_months(Months::new(months))
                })?;
            }
            Frequency::Yearly => {
                let step = rule.interval().checked_mul(12);
                self.walk(rule, &mut out, |i| {
                    let months = u32::try_from(i).ok()?.checked_mul(step?)?;
                    local.checked_add_months(Months::new(months))
                })?;
            }
            Frequency::Weekly => self.expand_weekly(rule, local, &mut out)?,
        }

        Ok(out)
    }

    /// Shared iteration for daily / monthly / yearly: one occurrence per step.
    fn walk(
        &self,
        rule: &RecurrenceRule,
        out: &mut Vec<Occurrence>,
        step: impl Fn(u64) -> Option<NaiveDateTime>,
    ) -> Result<(), OpsError> {
        let mut i: u64 = 0;
        loop {
            if let Termination::After(n) = rule.termination()
                && i >= u64::from(n.get())
            {
                break;
            }
            let Some(start) = step(i) else { break };
            if let Termination::Until(end) = rule.termination()
                && start.date() > end
            {
                break;
            }
            self.push(out, self.occurrence(start, start.date()))?;
            i += 1;
        }
        Ok(())
    }

    /// Weekly: every `7 * interval` days, one occurrence per listed weekday.
    ///
    /// The weekday offset is taken relative to the iteration start using
    /// Sunday = 0 numbering, so a weekday "earlier" than the anchor's lands
    /// before the iteration start.
    fn expand_weekly(
        &self,
        rule: &RecurrenceRule,
        local: NaiveDateTime,
        out: &mut Vec<Occurrence>,
    ) -> Result<(), OpsError> {
        let step = 7 * i64::from(rule.interval());
        let mut i: i64 = 0;
        loop {
            if let Termination::After(n) = rule.termination()
                && i >= i64::from(n.get())
            {
                break;
            }
            let Some(week_start) = shift_days(local, i * step) else { break };
            let base = i64::from(week_start.weekday().num_days_from_sunday());

            let mut emitted = 0usize;
            for day in rule.byweekday() {
                let offset = i64::from(day.num_days_from_sunday()) - base;
                let Some(start) = shift_days(week_start, offset) else { continue };
                if let Termination::Until(end) = rule.termination()
                    && start.date() > end
                {
                    continue;
                }
                self.push(out, self.occurrence(start, start.date()))?;
                emitted += 1;
            }

            if matches!(rule.termination(), Termination::Until(_)) && emitted == 0 {
                break;
            }
            i += 1;
        }
        Ok(())
    }

    fn push(&self, out: &mut Vec<Occurrence>, occurrence: Occurrence) -> Result<(), OpsError> {
        if out.len() >= self.max_occurrences {
            return Err(OpsError::validation(format!(
                "recurrence expands to more than {} occurrences",
                self.max_occurrences
            )));
        }
        out.push(occurrence);
        Ok(())
    }

    fn occurrence(&self, start: NaiveDateTime, due_date: NaiveDate) -> Occurrence {
        let start = self.to_utc(start);
        let due = self.to_utc(due_date.and_time(self.cutoff)).max(start);
        Occurrence { start, due }
    }

    /// Local wall clock → UTC.
    ///
    /// A wall time inside a DST gap does not exist; it is read with the
    /// offset in force before the gap, which lands it just after the gap
    /// (02:30 on a spring-forward night becomes 03:30).
    fn to_utc(&self, local: NaiveDateTime) -> DateTime<Utc> {
        if let Some(dt) = self.tz.from_local_datetime(&local).earliest() {
            return dt.with_timezone(&Utc);
        }
        let before = local - Duration::hours(GAP_LOOKBACK_HOURS);
        let offset = self
            .tz
            .offset_from_local_datetime(&before)
            .earliest()
            .map_or(0, |offset| offset.fix().local_minus_utc());
        (local - Duration::seconds(i64::from(offset))).and_utc()
    }
}

/// No DST gap lasts longer than this.
const GAP_LOOKBACK_HOURS: i64 = 3;

fn shift_days(at: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    if days >= 0 {
        at.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        at.checked_sub_days(Days::new(days.unsigned_abs()))
    }
}
