use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Frequency, RecurringTransactionRecord};
use crate::errors::{RecurringError, Result};

/// How a MONTHLY template moves forward after an occurrence is processed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "mode", content = "days", rename_all = "snake_case")]
pub enum MonthStep {
    /// Next calendar month, day anchored on the start date and clamped to month length.
    #[default]
    Calendar,
    /// A fixed number of days.
    FixedDays(u32),
}

/// Advancement rule applied by the generator to `next_occurrence_timestamp`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AdvancePolicy {
    pub month_step: MonthStep,
}

impl AdvancePolicy {
    pub fn new(month_step: MonthStep) -> Self {
        Self { month_step }
    }

    /// Next occurrence for `record` after its current `next_occurrence_timestamp`.
    pub fn next_after(&self, record: &RecurringTransactionRecord) -> Result<i64> {
        self.next_after_millis(
            record.next_occurrence_timestamp,
            record.start_timestamp,
            &record.frequency,
        )
    }

    pub fn next_after_millis(&self, current: i64, start: i64, frequency: &Frequency) -> Result<i64> {
        let current_time = from_millis(current)?;
        let anchor_day = from_millis(start)?.day();
        let next = match frequency {
            Frequency::Daily => add_days(current_time, 1)?,
            Frequency::Weekly => add_days(current_time, 7)?,
            Frequency::Monthly => match self.month_step {
                MonthStep::Calendar => shift_months(current_time, 1, anchor_day)?,
                MonthStep::FixedDays(days) => {
                    self.month_step.validate()?;
                    add_days(current_time, i64::from(days))?
                }
            },
            Frequency::Yearly => shift_months(current_time, 12, anchor_day)?,
            Frequency::Unrecognized(raw) => {
                return Err(RecurringError::UnsupportedFrequency(raw.clone()))
            }
        };
        Ok(next.timestamp_millis())
    }
}

impl MonthStep {
    /// Rejects a zero-length fixed step, which would never advance.
    pub fn validate(&self) -> Result<()> {
        match self {
            MonthStep::FixedDays(0) => Err(RecurringError::ConfigError(
                "month_step fixed days must be at least 1".into(),
            )),
            _ => Ok(()),
        }
    }
}

fn add_days(from: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    from.checked_add_signed(Duration::days(days)).ok_or_else(|| {
        RecurringError::InvalidInput(format!("cannot schedule {} day(s) after {}", days, from))
    })
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| RecurringError::InvalidInput(format!("timestamp {} out of range", millis)))
}

fn shift_months(from: DateTime<Utc>, months: i32, anchor_day: u32) -> Result<DateTime<Utc>> {
    let date = from.date_naive();
    let mut year = date.year();
    let mut month = date.month() as i32 + months;
    while month > 12 {
        month -= 12;
        year += 1;
    }
    let day = anchor_day.min(days_in_month(year, month as u32));
    let shifted = NaiveDate::from_ymd_opt(year, month as u32, day)
        .ok_or_else(|| RecurringError::InvalidInput(format!("cannot schedule {}-{}", year, month)))?;
    Ok(shifted.and_time(from.time()).and_utc())
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
