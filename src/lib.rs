#![doc(test(attr(deny(warnings))))]

//! Recurring Core models recurring transaction templates for personal-finance
//! tracking: when a template is due, how its schedule advances, and how due
//! templates are materialized into concrete transactions.

pub mod cli;
pub mod config;
pub mod core;
pub mod errors;
pub mod schedule;
pub mod storage;
pub mod utils;

pub use errors::{RecurringError, Result};
pub use schedule::{Frequency, RecurringTransactionRecord};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Recurring Core tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
