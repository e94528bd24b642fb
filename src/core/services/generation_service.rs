//! Materializes due recurring templates into concrete transactions.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    core::clock::Clock,
    schedule::{AdvancePolicy, RecordBook, RecurringTransactionRecord, Transaction, MILLIS_PER_DAY},
};

pub const DEFAULT_MAX_CATCH_UP: usize = 366;

/// A due template that could not be processed, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedTemplate {
    pub template_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct GenerationReport {
    pub generated: Vec<Uuid>,
    pub processed_templates: usize,
    pub skipped: Vec<SkippedTemplate>,
    /// Templates still due after hitting the catch-up limit.
    pub capped: Vec<String>,
}

impl GenerationReport {
    pub fn is_empty(&self) -> bool {
        self.generated.is_empty() && self.skipped.is_empty()
    }
}

/// Walks a book's templates and generates every occurrence that has come due.
///
/// A template's transactions and its schedule advance are applied to the book
/// together, so persisting the book afterwards never stores one without the other.
#[derive(Debug, Clone, Copy)]
pub struct GenerationService {
    policy: AdvancePolicy,
    max_catch_up: usize,
}

impl Default for GenerationService {
    fn default() -> Self {
        Self::new(AdvancePolicy::default(), DEFAULT_MAX_CATCH_UP)
    }
}

impl GenerationService {
    pub fn new(policy: AdvancePolicy, max_catch_up: usize) -> Self {
        Self {
            policy,
            max_catch_up: max_catch_up.max(1),
        }
    }

    pub fn run(&self, book: &mut RecordBook, clock: &dyn Clock) -> GenerationReport {
        self.generate_due(book, clock.now_millis())
    }

    pub fn generate_due(&self, book: &mut RecordBook, now: i64) -> GenerationReport {
        let mut report = GenerationReport::default();
        let mut created = Vec::new();

        for template in book.templates.iter_mut().filter(|t| t.is_due(now)) {
            match self.occurrences_until(template, now) {
                Ok((transactions, next)) => {
                    debug!(
                        "template {} produced {} occurrence(s), next at {}",
                        template.id,
                        transactions.len(),
                        next
                    );
                    template.mark_processed(now, next);
                    if template.is_due(now) {
                        warn!(
                            "template {} still due after {} occurrence(s); remaining backlog deferred",
                            template.id, self.max_catch_up
                        );
                        report.capped.push(template.id.clone());
                    }
                    report.processed_templates += 1;
                    report.generated.extend(transactions.iter().map(|t| t.id));
                    created.extend(transactions);
                }
                Err(reason) => {
                    warn!("skipping recurring template {}: {}", template.id, reason);
                    report.skipped.push(SkippedTemplate {
                        template_id: template.id.clone(),
                        reason,
                    });
                }
            }
        }

        if !created.is_empty() {
            book.transactions.extend(created);
            book.touch();
        }
        info!(
            "generated {} transaction(s) from {} template(s), {} skipped",
            report.generated.len(),
            report.processed_templates,
            report.skipped.len()
        );
        report
    }

    /// Active templates whose next occurrence falls within `days` of `now`,
    /// ordered by next occurrence. Overdue templates are included.
    pub fn upcoming<'a>(
        &self,
        book: &'a RecordBook,
        now: i64,
        days: u32,
    ) -> Vec<&'a RecurringTransactionRecord> {
        let horizon = now.saturating_add(days as i64 * MILLIS_PER_DAY);
        let mut upcoming: Vec<_> = book
            .templates
            .iter()
            .filter(|t| t.is_active && t.next_occurrence_timestamp <= horizon)
            .collect();
        upcoming.sort_by_key(|t| (t.next_occurrence_timestamp, t.id.clone()));
        upcoming
    }

    fn occurrences_until(
        &self,
        template: &RecurringTransactionRecord,
        now: i64,
    ) -> Result<(Vec<Transaction>, i64), String> {
        let mut transactions = Vec::new();
        let mut next = template.next_occurrence_timestamp;
        while next <= now && transactions.len() < self.max_catch_up {
            transactions.push(Transaction::from_template(template, next, now));
            let advanced = self
                .policy
                .next_after_millis(next, template.start_timestamp, &template.frequency)
                .map_err(|err| err.to_string())?;
            if advanced <= next {
                return Err(format!("schedule did not advance past {}", next));
            }
            next = advanced;
        }
        Ok((transactions, next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;
    use crate::schedule::{Frequency, MonthStep};
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    fn at(y: i32, m: u32, d: u32) -> i64 {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
            .unwrap()
            .timestamp_millis()
    }

    fn book_with(frequency: Frequency, start: i64) -> (RecordBook, String) {
        let mut book = RecordBook::new("Test");
        let template = RecurringTransactionRecord::new(
            1,
            "Streaming",
            "Entertainment",
            Decimal::new(999, 2),
            true,
            frequency,
            start,
            start,
        );
        let id = book.add_template(template).unwrap();
        (book, id)
    }

    #[test]
    fn nothing_happens_before_first_occurrence() {
        let (mut book, id) = book_with(Frequency::Monthly, at(2025, 2, 1));
        let report = GenerationService::default().generate_due(&mut book, at(2025, 1, 31));
        assert!(report.is_empty());
        assert!(!book.template(&id).unwrap().has_been_processed());
    }

    #[test]
    fn due_template_generates_and_advances() {
        let (mut book, id) = book_with(Frequency::Monthly, at(2025, 1, 15));
        let now = at(2025, 1, 15) + 1_000;
        let report = GenerationService::default().generate_due(&mut book, now);

        assert_eq!(report.generated.len(), 1);
        let template = book.template(&id).unwrap();
        assert_eq!(template.last_processed_timestamp, now);
        assert_eq!(template.next_occurrence_timestamp, at(2025, 2, 15));
        assert!(!template.is_due(now));
        assert_eq!(book.transactions[0].occurred_at, at(2025, 1, 15));
    }

    #[test]
    fn missed_occurrences_are_caught_up() {
        let (mut book, id) = book_with(Frequency::Weekly, at(2025, 1, 1));
        let report = GenerationService::default().generate_due(&mut book, at(2025, 1, 22));
        assert_eq!(report.generated.len(), 4);
        let dates: Vec<i64> = book
            .transactions_for_template(&id)
            .iter()
            .map(|t| t.occurred_at)
            .collect();
        assert_eq!(
            dates,
            vec![at(2025, 1, 1), at(2025, 1, 8), at(2025, 1, 15), at(2025, 1, 22)]
        );
        assert_eq!(
            book.template(&id).unwrap().next_occurrence_timestamp,
            at(2025, 1, 29)
        );
    }

    #[test]
    fn second_run_does_not_double_process() {
        let (mut book, _) = book_with(Frequency::Daily, at(2025, 1, 1));
        let service = GenerationService::default();
        let now = at(2025, 1, 3);
        service.generate_due(&mut book, now);
        let again = service.generate_due(&mut book, now);
        assert!(again.generated.is_empty());
        assert_eq!(book.transactions.len(), 3);
    }

    #[test]
    fn catch_up_limit_defers_backlog() {
        let (mut book, id) = book_with(Frequency::Daily, at(2025, 1, 1));
        let service = GenerationService::new(AdvancePolicy::default(), 2);
        let report = service.generate_due(&mut book, at(2025, 1, 10));
        assert_eq!(report.generated.len(), 2);
        assert_eq!(report.capped, vec![id.clone()]);
        assert!(book.template(&id).unwrap().is_due(at(2025, 1, 10)));
    }

    #[test]
    fn unrecognized_frequency_is_skipped_untouched() {
        let (mut book, id) = book_with(Frequency::from("BIWEEKLY"), at(2025, 1, 1));
        let before = book.template(&id).unwrap().clone();
        let report = GenerationService::default().generate_due(&mut book, at(2025, 2, 1));
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].template_id, id);
        assert_eq!(book.template(&id).unwrap(), &before);
        assert!(book.transactions.is_empty());
    }

    #[test]
    fn template_at_the_end_of_time_is_skipped() {
        let last = DateTime::<Utc>::MAX_UTC.timestamp_millis();
        let (mut book, id) = book_with(Frequency::Daily, last);
        let healthy = book
            .add_template(RecurringTransactionRecord::new(
                1,
                "Gym",
                "Health",
                Decimal::ONE,
                true,
                Frequency::Weekly,
                at(2025, 1, 1),
                at(2025, 1, 1),
            ))
            .unwrap();
        let before = book.template(&id).unwrap().clone();

        let report = GenerationService::default().generate_due(&mut book, last);

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].template_id, id);
        assert_eq!(book.template(&id).unwrap(), &before);
        assert_eq!(report.processed_templates, 1);
        assert!(book.transactions.iter().all(|t| t.template_id == healthy));
    }

    #[test]
    fn paused_template_is_ignored() {
        let (mut book, id) = book_with(Frequency::Daily, at(2025, 1, 1));
        book.set_active(&id, false).unwrap();
        let report = GenerationService::default().generate_due(&mut book, at(2025, 1, 5));
        assert!(report.is_empty());
    }

    #[test]
    fn fixed_day_policy_is_applied() {
        let (mut book, id) = book_with(Frequency::Monthly, at(2025, 1, 31));
        let service = GenerationService::new(AdvancePolicy::new(MonthStep::FixedDays(30)), 10);
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap());
        service.run(&mut book, &clock);
        assert_eq!(
            book.template(&id).unwrap().next_occurrence_timestamp,
            at(2025, 3, 2)
        );
    }

    #[test]
    fn upcoming_orders_by_next_occurrence() {
        let mut book = RecordBook::new("Test");
        for (name, start) in [("Later", at(2025, 1, 20)), ("Sooner", at(2025, 1, 5))] {
            let template = RecurringTransactionRecord::new(
                1,
                name,
                "Bills",
                Decimal::ONE,
                true,
                Frequency::Monthly,
                start,
                start,
            );
            book.add_template(template).unwrap();
        }
        let far = RecurringTransactionRecord::new(
            1,
            "Far",
            "Bills",
            Decimal::ONE,
            true,
            Frequency::Yearly,
            at(2025, 6, 1),
            at(2025, 1, 1),
        );
        book.add_template(far).unwrap();

        let names: Vec<&str> = GenerationService::default()
            .upcoming(&book, at(2025, 1, 1), 30)
            .iter()
            .map(|t| t.counterparty.as_str())
            .collect();
        assert_eq!(names, vec!["Sooner", "Later"]);
    }
}
