//! Aggregate of recurring templates and the transactions generated from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{RecurringTransactionRecord, Transaction};
use crate::errors::{RecurringError, Result};

pub const BOOK_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordBook {
    pub name: String,
    #[serde(default)]
    pub templates: Vec<RecurringTransactionRecord>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    BOOK_SCHEMA_VERSION
}

/// Counts returned by [`RecordBook::remove_owner`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemovalSummary {
    pub templates: usize,
    pub transactions: usize,
}

impl RecordBook {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            templates: Vec::new(),
            transactions: Vec::new(),
            created_at: now,
            updated_at: now,
            schema_version: BOOK_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Adds a template after checking its invariants. Ids must be unique.
    pub fn add_template(&mut self, template: RecurringTransactionRecord) -> Result<String> {
        template.validate()?;
        if self.template(&template.id).is_some() {
            return Err(RecurringError::InvalidRecord(format!(
                "duplicate template id {}",
                template.id
            )));
        }
        let id = template.id.clone();
        self.templates.push(template);
        self.touch();
        Ok(id)
    }

    pub fn template(&self, id: &str) -> Option<&RecurringTransactionRecord> {
        self.templates.iter().find(|t| t.id == id)
    }

    pub fn template_mut(&mut self, id: &str) -> Option<&mut RecurringTransactionRecord> {
        self.templates.iter_mut().find(|t| t.id == id)
    }

    /// Resolves a full id or an unambiguous id prefix.
    pub fn resolve_id(&self, id_or_prefix: &str) -> Result<String> {
        if self.template(id_or_prefix).is_some() {
            return Ok(id_or_prefix.to_string());
        }
        let mut matches = self
            .templates
            .iter()
            .filter(|t| !id_or_prefix.is_empty() && t.id.starts_with(id_or_prefix));
        match (matches.next(), matches.next()) {
            (Some(found), None) => Ok(found.id.clone()),
            (Some(_), Some(_)) => Err(RecurringError::InvalidInput(format!(
                "template id prefix `{}` is ambiguous",
                id_or_prefix
            ))),
            _ => Err(RecurringError::RecordNotFound(id_or_prefix.to_string())),
        }
    }

    /// Removes a template together with the transactions generated from it.
    pub fn remove_template(&mut self, id: &str) -> Result<RecurringTransactionRecord> {
        let index = self
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| RecurringError::RecordNotFound(id.to_string()))?;
        let removed = self.templates.remove(index);
        self.transactions.retain(|txn| txn.template_id != removed.id);
        self.touch();
        Ok(removed)
    }

    /// Cascade delete for a removed user.
    pub fn remove_owner(&mut self, owner_id: i64) -> RemovalSummary {
        let templates_before = self.templates.len();
        let transactions_before = self.transactions.len();
        self.templates.retain(|t| t.owner_id != owner_id);
        self.transactions.retain(|txn| txn.owner_id != owner_id);
        let summary = RemovalSummary {
            templates: templates_before - self.templates.len(),
            transactions: transactions_before - self.transactions.len(),
        };
        if summary != RemovalSummary::default() {
            self.touch();
        }
        summary
    }

    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        let template = self
            .template_mut(id)
            .ok_or_else(|| RecurringError::RecordNotFound(id.to_string()))?;
        template.set_active(active);
        self.touch();
        Ok(())
    }

    pub fn templates_for_owner(&self, owner_id: i64) -> Vec<&RecurringTransactionRecord> {
        self.templates
            .iter()
            .filter(|t| t.owner_id == owner_id)
            .collect()
    }

    pub fn due_templates(&self, now: i64) -> Vec<&RecurringTransactionRecord> {
        self.templates.iter().filter(|t| t.is_due(now)).collect()
    }

    pub fn transactions_for_template(&self, template_id: &str) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|txn| txn.template_id == template_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::Frequency;
    use rust_decimal::Decimal;

    fn template(owner: i64, start: i64) -> RecurringTransactionRecord {
        RecurringTransactionRecord::new(
            owner,
            "Gym",
            "Health",
            Decimal::new(4_500, 2),
            true,
            Frequency::Monthly,
            start,
            start,
        )
    }

    #[test]
    fn add_rejects_invalid_and_duplicate_templates() {
        let mut book = RecordBook::new("Home");
        let mut bad = template(1, 10);
        bad.amount = Decimal::new(-1, 0);
        assert!(book.add_template(bad).is_err());

        let good = template(1, 10);
        let copy = good.clone();
        book.add_template(good).expect("add template");
        assert!(book.add_template(copy).is_err());
        assert_eq!(book.templates.len(), 1);
    }

    #[test]
    fn remove_owner_cascades_to_transactions() {
        let mut book = RecordBook::new("Home");
        let mine = template(1, 10);
        let theirs = template(2, 10);
        book.transactions
            .push(Transaction::from_template(&mine, 10, 11));
        book.transactions
            .push(Transaction::from_template(&theirs, 10, 11));
        book.add_template(mine).unwrap();
        book.add_template(theirs).unwrap();

        let summary = book.remove_owner(1);
        assert_eq!(
            summary,
            RemovalSummary {
                templates: 1,
                transactions: 1
            }
        );
        assert!(book.templates.iter().all(|t| t.owner_id == 2));
        assert!(book.transactions.iter().all(|t| t.owner_id == 2));
    }

    #[test]
    fn resolve_id_accepts_unique_prefix() {
        let mut book = RecordBook::new("Home");
        let id = book.add_template(template(1, 10)).unwrap();
        assert_eq!(book.resolve_id(&id[..8]).unwrap(), id);
        assert!(matches!(
            book.resolve_id("zzzz"),
            Err(RecurringError::RecordNotFound(_))
        ));
    }

    #[test]
    fn due_templates_skip_paused() {
        let mut book = RecordBook::new("Home");
        let id = book.add_template(template(1, 10)).unwrap();
        assert_eq!(book.due_templates(10).len(), 1);
        book.set_active(&id, false).unwrap();
        assert!(book.due_templates(10).is_empty());
    }
}
