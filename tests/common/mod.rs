#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use recurring_core::{
    schedule::{Frequency, RecurringTransactionRecord},
    storage::JsonStorage,
};
use rust_decimal::Decimal;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Creates a unique data directory that outlives the calling test.
pub fn temp_home() -> PathBuf {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);
    base
}

pub fn storage() -> JsonStorage {
    JsonStorage::new(Some(temp_home()), Some(3)).expect("create json storage backend")
}

pub fn millis(y: i32, m: u32, d: u32) -> i64 {
    Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
        .unwrap()
        .timestamp_millis()
}

pub fn template(counterparty: &str, frequency: Frequency, start: i64) -> RecurringTransactionRecord {
    RecurringTransactionRecord::new(
        1,
        counterparty,
        "Bills",
        Decimal::new(2_500, 2),
        true,
        frequency,
        start,
        start,
    )
}
