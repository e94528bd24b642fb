pub mod json_backend;

use crate::{errors::RecurringError, schedule::RecordBook};

pub type Result<T> = std::result::Result<T, RecurringError>;

/// Abstraction over persistence backends capable of storing record books and snapshots.
pub trait RecordStorage: Send + Sync {
    fn save(&self, book: &RecordBook, name: &str) -> Result<()>;
    fn load(&self, name: &str) -> Result<RecordBook>;
    fn exists(&self, name: &str) -> bool;
    fn list_books(&self) -> Result<Vec<String>>;
    fn backup(&self, book: &RecordBook, name: &str, note: Option<&str>) -> Result<String>;
    fn list_backups(&self, name: &str) -> Result<Vec<String>>;
    fn restore(&self, name: &str, backup_name: &str) -> Result<RecordBook>;
}

pub use json_backend::JsonStorage;
