//! Recurring transaction templates and their due-date queries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Frequency;
use crate::errors::{RecurringError, Result};

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// A template that generates concrete transactions on a schedule.
///
/// All timestamps are epoch milliseconds. `last_processed_timestamp == 0`
/// means the template has never been processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringTransactionRecord {
    pub id: String,
    pub owner_id: i64,
    pub counterparty: String,
    pub category: String,
    pub amount: Decimal,
    pub is_expense: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub frequency: Frequency,
    pub start_timestamp: i64,
    pub next_occurrence_timestamp: i64,
    #[serde(default)]
    pub last_processed_timestamp: i64,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: i64,
}

fn default_active() -> bool {
    true
}

impl Default for RecurringTransactionRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            owner_id: 0,
            counterparty: String::new(),
            category: String::new(),
            amount: Decimal::ZERO,
            is_expense: true,
            description: None,
            attachment_path: None,
            frequency: Frequency::default(),
            start_timestamp: 0,
            next_occurrence_timestamp: 0,
            last_processed_timestamp: 0,
            is_active: true,
            created_at: 0,
        }
    }
}

impl RecurringTransactionRecord {
    /// Creates an active template whose first occurrence is its start time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner_id: i64,
        counterparty: impl Into<String>,
        category: impl Into<String>,
        amount: Decimal,
        is_expense: bool,
        frequency: Frequency,
        start_timestamp: i64,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            owner_id,
            counterparty: counterparty.into(),
            category: category.into(),
            amount,
            is_expense,
            frequency,
            start_timestamp,
            next_occurrence_timestamp: start_timestamp,
            created_at,
            ..Self::default()
        }
    }

    /// True iff the template is active and its next occurrence is at or before `current_time`.
    pub fn is_due(&self, current_time: i64) -> bool {
        self.is_active && self.next_occurrence_timestamp <= current_time
    }

    pub fn frequency_label(&self) -> String {
        self.frequency.label()
    }

    /// Whole elapsed days until the next occurrence, truncated toward zero.
    /// Negative when overdue; not aligned to midnight. Computed in `i128` so
    /// the difference of any two `i64` timestamps is exact.
    pub fn days_until_next(&self, current_time: i64) -> i64 {
        let delta = i128::from(self.next_occurrence_timestamp) - i128::from(current_time);
        // |delta| < 2^65 so the day count always fits back into i64.
        (delta / i128::from(MILLIS_PER_DAY)) as i64
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.start_timestamp)
    }

    pub fn next_occurrence_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.next_occurrence_timestamp)
    }

    pub fn last_processed_time(&self) -> Option<DateTime<Utc>> {
        if self.has_been_processed() {
            DateTime::from_timestamp_millis(self.last_processed_timestamp)
        } else {
            None
        }
    }

    pub fn created_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.created_at)
    }

    pub fn has_been_processed(&self) -> bool {
        self.last_processed_timestamp != 0
    }

    /// Amount with cash-flow sign applied: negative for expenses.
    pub fn signed_amount(&self) -> Decimal {
        if self.is_expense {
            -self.amount
        } else {
            self.amount
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }

    /// Records that an occurrence was materialized at `processed_at` and moves
    /// the schedule to `next_occurrence`.
    pub fn mark_processed(&mut self, processed_at: i64, next_occurrence: i64) {
        self.last_processed_timestamp = processed_at;
        self.next_occurrence_timestamp = next_occurrence;
    }

    /// Checks the creation invariants.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(RecurringError::InvalidRecord("id must not be empty".into()));
        }
        if self.amount < Decimal::ZERO {
            return Err(RecurringError::InvalidRecord(format!(
                "amount {} must not be negative; use is_expense for direction",
                self.amount
            )));
        }
        if self.next_occurrence_timestamp < self.start_timestamp {
            return Err(RecurringError::InvalidRecord(format!(
                "next occurrence {} precedes start {}",
                self.next_occurrence_timestamp, self.start_timestamp
            )));
        }
        if self.last_processed_timestamp < 0 {
            return Err(RecurringError::InvalidRecord(
                "last processed timestamp must be 0 or a valid time".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const NOW: i64 = 1_735_689_600_000; // 2025-01-01T00:00:00Z

    fn record(next: i64) -> RecurringTransactionRecord {
        let mut record = RecurringTransactionRecord::new(
            7,
            "Landlord",
            "Housing",
            Decimal::new(120_000, 2),
            true,
            Frequency::Monthly,
            next,
            NOW,
        );
        record.next_occurrence_timestamp = next;
        record
    }

    #[test]
    fn due_boundary_is_inclusive() {
        let rec = record(NOW);
        assert!(rec.is_due(NOW));
        assert!(!rec.is_due(NOW - 1));
        assert!(rec.is_due(NOW + 1));
    }

    #[test]
    fn inactive_template_is_never_due() {
        let mut rec = record(NOW - MILLIS_PER_DAY);
        rec.set_active(false);
        assert!(!rec.is_due(NOW));
        assert!(!rec.is_due(i64::MAX));
    }

    #[test]
    fn days_until_next_counts_whole_days() {
        assert_eq!(record(NOW + 2 * MILLIS_PER_DAY).days_until_next(NOW), 2);
        assert_eq!(record(NOW - MILLIS_PER_DAY).days_until_next(NOW), -1);
    }

    #[test]
    fn days_until_next_truncates_toward_zero() {
        assert_eq!(record(NOW + MILLIS_PER_DAY - 1).days_until_next(NOW), 0);
        assert_eq!(record(NOW - MILLIS_PER_DAY + 1).days_until_next(NOW), 0);
        assert_eq!(record(NOW - 36 * 3_600_000).days_until_next(NOW), -1);
    }

    #[test]
    fn days_until_next_is_total_at_extremes() {
        assert_eq!(record(i64::MAX).days_until_next(-1), 106_751_991_167);
        assert_eq!(record(i64::MIN).days_until_next(i64::MAX), -213_503_982_334);
        assert_eq!(record(i64::MAX).days_until_next(i64::MAX), 0);
    }

    #[test]
    fn frequency_label_maps_known_and_passes_through_unknown() {
        let mut rec = record(NOW);
        assert_eq!(rec.frequency_label(), "Monthly");
        rec.frequency = Frequency::from("BIWEEKLY");
        assert_eq!(rec.frequency_label(), "BIWEEKLY");
    }

    #[test]
    fn derived_times_match_stored_millis() {
        let start = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap()
            + chrono::Duration::milliseconds(589);
        let mut rec = record(start.timestamp_millis());
        rec.start_timestamp = start.timestamp_millis();
        assert_eq!(rec.start_time(), Some(start));
        assert_eq!(
            rec.next_occurrence_time().map(|t| t.timestamp_millis()),
            Some(rec.next_occurrence_timestamp)
        );
        assert_eq!(rec.last_processed_time(), None);
        rec.mark_processed(NOW, start.timestamp_millis());
        assert_eq!(
            rec.last_processed_time().map(|t| t.timestamp_millis()),
            Some(NOW)
        );
    }

    #[test]
    fn signed_amount_follows_direction() {
        let mut rec = record(NOW);
        assert_eq!(rec.signed_amount(), Decimal::new(-120_000, 2));
        rec.is_expense = false;
        assert_eq!(rec.signed_amount(), Decimal::new(120_000, 2));
    }

    #[test]
    fn validate_rejects_broken_invariants() {
        let mut rec = record(NOW);
        assert!(rec.validate().is_ok());

        rec.amount = Decimal::new(-5, 0);
        assert!(matches!(rec.validate(), Err(RecurringError::InvalidRecord(_))));

        let mut rec = record(NOW);
        rec.next_occurrence_timestamp = rec.start_timestamp - 1;
        assert!(rec.validate().is_err());
    }

    #[test]
    fn default_record_is_active_and_unprocessed() {
        let rec = RecurringTransactionRecord::default();
        assert!(rec.is_active);
        assert!(!rec.has_been_processed());
        assert_eq!(rec.frequency, Frequency::Monthly);
    }
}
