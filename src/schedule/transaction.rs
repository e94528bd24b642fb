use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecurringTransactionRecord;

/// A concrete transaction materialized from a recurring template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub template_id: String,
    pub owner_id: i64,
    pub counterparty: String,
    pub category: String,
    pub amount: Decimal,
    pub is_expense: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
    pub occurred_at: i64,
    pub created_at: i64,
}

impl Transaction {
    /// Copies the template fields for the occurrence scheduled at `occurred_at`.
    pub fn from_template(
        template: &RecurringTransactionRecord,
        occurred_at: i64,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            template_id: template.id.clone(),
            owner_id: template.owner_id,
            counterparty: template.counterparty.clone(),
            category: template.category.clone(),
            amount: template.amount,
            is_expense: template.is_expense,
            description: template.description.clone(),
            attachment_path: template.attachment_path.clone(),
            occurred_at,
            created_at,
        }
    }

    pub fn occurred_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.occurred_at)
    }

    pub fn signed_amount(&self) -> Decimal {
        if self.is_expense {
            -self.amount
        } else {
            self.amount
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let when = self
            .occurred_time()
            .map(|t| t.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.occurred_at.to_string());
        write!(
            f,
            "{} {} {} ({})",
            when,
            self.counterparty,
            self.signed_amount(),
            self.category
        )
    }
}
