//! Business logic helpers for managing recurring templates.

use rust_decimal::Decimal;
use tracing::info;

use crate::{
    core::clock::Clock,
    errors::{RecurringError, Result},
    schedule::{Frequency, RecordBook, RecurringTransactionRecord, RemovalSummary},
};

/// User-supplied fields for a new recurring template.
#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub owner_id: i64,
    pub counterparty: String,
    pub category: String,
    pub amount: Decimal,
    pub is_expense: bool,
    pub frequency: Frequency,
    pub start_timestamp: i64,
    pub description: Option<String>,
    pub attachment_path: Option<String>,
}

/// Provides validated CRUD helpers for the templates of a record book.
pub struct TemplateService;

impl TemplateService {
    /// Creates a template stamped with the clock's current time and returns its id.
    pub fn create(book: &mut RecordBook, input: NewTemplate, clock: &dyn Clock) -> Result<String> {
        if input.counterparty.trim().is_empty() {
            return Err(RecurringError::InvalidInput(
                "counterparty must not be empty".into(),
            ));
        }
        if !input.frequency.is_recognized() {
            return Err(RecurringError::UnsupportedFrequency(
                input.frequency.as_str().to_string(),
            ));
        }
        let mut template = RecurringTransactionRecord::new(
            input.owner_id,
            input.counterparty.trim(),
            input.category.trim(),
            input.amount,
            input.is_expense,
            input.frequency,
            input.start_timestamp,
            clock.now_millis(),
        );
        template.description = input.description;
        template.attachment_path = input.attachment_path;
        let id = book.add_template(template)?;
        info!("created recurring template {}", id);
        Ok(id)
    }

    pub fn pause(book: &mut RecordBook, id: &str) -> Result<()> {
        book.set_active(id, false)?;
        info!("paused recurring template {}", id);
        Ok(())
    }

    pub fn resume(book: &mut RecordBook, id: &str) -> Result<()> {
        book.set_active(id, true)?;
        info!("resumed recurring template {}", id);
        Ok(())
    }

    pub fn delete(book: &mut RecordBook, id: &str) -> Result<RecurringTransactionRecord> {
        let removed = book.remove_template(id)?;
        info!("deleted recurring template {}", id);
        Ok(removed)
    }

    /// Removes every template and transaction that belongs to `owner_id`.
    pub fn delete_owner(book: &mut RecordBook, owner_id: i64) -> RemovalSummary {
        let summary = book.remove_owner(owner_id);
        info!(
            "removed owner {}: {} template(s), {} transaction(s)",
            owner_id, summary.templates, summary.transactions
        );
        summary
    }

    /// Returns templates ordered by next occurrence.
    pub fn list(book: &RecordBook) -> Vec<&RecurringTransactionRecord> {
        let mut templates: Vec<_> = book.templates.iter().collect();
        templates.sort_by_key(|t| t.next_occurrence_timestamp);
        templates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::FixedClock;

    fn input(frequency: &str) -> NewTemplate {
        NewTemplate {
            owner_id: 3,
            counterparty: " Utility Co ".into(),
            category: "Bills".into(),
            amount: Decimal::new(8_050, 2),
            is_expense: true,
            frequency: Frequency::from(frequency),
            start_timestamp: 1_000,
            description: Some("electricity".into()),
            attachment_path: None,
        }
    }

    #[test]
    fn create_stamps_clock_time() {
        let mut book = RecordBook::new("Test");
        let clock = FixedClock::from_millis(5_000).unwrap();
        let id = TemplateService::create(&mut book, input("MONTHLY"), &clock).unwrap();
        let template = book.template(&id).unwrap();
        assert_eq!(template.created_at, 5_000);
        assert_eq!(template.counterparty, "Utility Co");
        assert_eq!(template.next_occurrence_timestamp, 1_000);
    }

    #[test]
    fn create_rejects_unknown_frequency() {
        let mut book = RecordBook::new("Test");
        let clock = FixedClock::from_millis(5_000).unwrap();
        let err = TemplateService::create(&mut book, input("FORTNIGHTLY"), &clock)
            .expect_err("unknown frequency must be rejected");
        assert!(matches!(err, RecurringError::UnsupportedFrequency(_)));
    }

    #[test]
    fn pause_and_resume_missing_template_fails() {
        let mut book = RecordBook::new("Test");
        assert!(matches!(
            TemplateService::pause(&mut book, "nope"),
            Err(RecurringError::RecordNotFound(_))
        ));
    }
}
