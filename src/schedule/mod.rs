//! Recurring schedule models, advancement rules, and the record book.

pub mod book;
pub mod frequency;
pub mod recurring;
pub mod time_interval;
pub mod transaction;

pub use book::{RecordBook, RemovalSummary, BOOK_SCHEMA_VERSION};
pub use frequency::Frequency;
pub use recurring::{RecurringTransactionRecord, MILLIS_PER_DAY};
pub use time_interval::{AdvancePolicy, MonthStep};
pub use transaction::Transaction;
