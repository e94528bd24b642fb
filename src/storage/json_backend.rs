use chrono::{DateTime, NaiveDateTime, Utc};
use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{debug, warn};

use crate::{
    core::utils::{ensure_dir, PathResolver},
    errors::RecurringError,
    schedule::{RecordBook, BOOK_SCHEMA_VERSION},
};

use super::{RecordStorage, Result};

const BOOK_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Stores each record book as a single pretty-printed JSON document.
#[derive(Clone)]
pub struct JsonStorage {
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> Result<Self> {
        let app_root = PathResolver::resolve_base(root);
        ensure_dir(&app_root)?;
        let books_dir = PathResolver::book_dir_in(&app_root);
        let backups_dir = PathResolver::backup_dir_in(&app_root);
        ensure_dir(&books_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            books_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn book_path(&self, name: &str) -> PathBuf {
        self.books_dir
            .join(format!("{}.{}", canonical_name(name), BOOK_EXTENSION))
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    pub fn backup_path(&self, name: &str, backup_name: &str) -> PathBuf {
        self.backup_dir(name).join(backup_name)
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let backup_name = self.unused_backup_name(name, None)?;
        fs::copy(path, self.backup_path(name, &backup_name))?;
        debug!("backed up {} to {}", path.display(), backup_name);
        self.prune_backups(name)
    }

    /// A backup file name that does not exist yet. Names taken within the same
    /// second get a `__<n>` sequence suffix.
    fn unused_backup_name(&self, name: &str, note: Option<&str>) -> Result<String> {
        let dir = self.backup_dir(name);
        ensure_dir(&dir)?;
        let stem = backup_stem(name, note);
        let mut candidate = format!("{}.{}", stem, BOOK_EXTENSION);
        let mut sequence = 1;
        while dir.join(&candidate).exists() {
            sequence += 1;
            candidate = format!("{}__{}.{}", stem, sequence, BOOK_EXTENSION);
        }
        Ok(candidate)
    }

    fn prune_backups(&self, name: &str) -> Result<()> {
        let backups = self.list_backups(name)?;
        for entry in backups.iter().skip(self.retention) {
            let path = self.backup_path(name, entry);
            if let Err(err) = fs::remove_file(&path) {
                warn!("failed to prune backup {}: {}", path.display(), err);
            }
        }
        Ok(())
    }
}

impl RecordStorage for JsonStorage {
    fn save(&self, book: &RecordBook, name: &str) -> Result<()> {
        let path = self.book_path(name);
        self.backup_existing_file(name, &path)?;
        save_book_to_path(book, &path)
    }

    fn load(&self, name: &str) -> Result<RecordBook> {
        let path = self.book_path(name);
        if !path.exists() {
            return Err(RecurringError::StorageError(format!(
                "record book `{}` not found",
                name
            )));
        }
        load_book_from_path(&path)
    }

    fn exists(&self, name: &str) -> bool {
        self.book_path(name).exists()
    }

    fn list_books(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn backup(&self, book: &RecordBook, name: &str, note: Option<&str>) -> Result<String> {
        let backup_name = self.unused_backup_name(name, note)?;
        save_book_to_path(book, &self.backup_path(name, &backup_name))?;
        self.prune_backups(name)?;
        Ok(backup_name)
    }

    fn list_backups(&self, name: &str) -> Result<Vec<String>> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                entries.push(file_name.to_string());
            }
        }
        entries.sort_by(|a, b| {
            Reverse(parse_backup_timestamp(a))
                .cmp(&Reverse(parse_backup_timestamp(b)))
                .then_with(|| b.cmp(a))
        });
        Ok(entries)
    }

    fn restore(&self, name: &str, backup_name: &str) -> Result<RecordBook> {
        let backup_path = self.backup_path(name, backup_name);
        if !backup_path.exists() {
            return Err(RecurringError::StorageError(format!(
                "backup `{}` not found",
                backup_name
            )));
        }
        let book = load_book_from_path(&backup_path)?;
        save_book_to_path(&book, &self.book_path(name))?;
        Ok(book)
    }
}

/// Writes the book to a temporary sibling and renames it over `path`.
pub fn save_book_to_path(book: &RecordBook, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(book)?;
    let tmp = tmp_path(path);
    write_synced(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_book_from_path(path: &Path) -> Result<RecordBook> {
    let data = fs::read_to_string(path)?;
    let book: RecordBook = serde_json::from_str(&data)?;
    if book.schema_version > BOOK_SCHEMA_VERSION {
        return Err(RecurringError::StorageError(format!(
            "record book `{}` is from a newer schema version ({})",
            path.display(),
            book.schema_version
        )));
    }
    Ok(book)
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches('_').is_empty() {
        "book".into()
    } else {
        sanitized
    }
}

fn backup_stem(name: &str, note: Option<&str>) -> String {
    let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
    let mut stem = format!("{}_{}", canonical_name(name), timestamp);
    if let Some(label) = sanitize_backup_note(note) {
        stem.push_str("__");
        stem.push_str(&label);
    }
    stem
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !sanitized.is_empty() && !last_dash {
            sanitized.push('-');
            last_dash = true;
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Extracts the `YYYYmmdd_HHMMSS` stamp that follows the book name.
fn parse_backup_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = file_name.strip_suffix(&format!(".{}", BOOK_EXTENSION))?;
    let stem = stem.split("__").next()?;
    let parts: Vec<&str> = stem.rsplitn(3, '_').collect();
    if parts.len() < 3 {
        return None;
    }
    let raw = format!("{}{}", parts[1], parts[0]);
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_synced(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
