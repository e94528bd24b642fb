use std::env;

use chrono::{DateTime, Utc};
use strsim::levenshtein;
use thiserror::Error;

use crate::{
    cli::{commands, output, registry::CommandRegistry},
    config::{Config, ConfigManager},
    core::{
        clock::{Clock, FixedClock, SystemClock},
        services::GenerationService,
    },
    errors::{CliError, RecurringError},
    schedule::RecordBook,
    storage::{JsonStorage, RecordStorage},
};

const NOW_ENV: &str = "RECURRING_CORE_NOW";
const DEFAULT_BOOK: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliMode {
    Interactive,
    Script,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Core(#[from] RecurringError),
}

pub type CommandResult = Result<LoopControl, CommandError>;

/// State shared by all shell commands: the open book and its collaborators.
pub struct ShellContext {
    pub mode: CliMode,
    pub running: bool,
    pub book: RecordBook,
    pub book_name: String,
    pub dirty: bool,
    pub config: Config,
    pub config_manager: ConfigManager,
    pub storage: Box<dyn RecordStorage>,
    pub clock: Box<dyn Clock>,
    pub registry: CommandRegistry,
}

impl ShellContext {
    pub fn new(mode: CliMode) -> Result<Self, CliError> {
        let config_manager = ConfigManager::new()?;
        let config = config_manager.load()?;
        let storage = JsonStorage::new(None, Some(config.backup_retention))?;
        let clock = clock_from_env()?;
        let book_name = config
            .last_opened_book
            .clone()
            .unwrap_or_else(|| DEFAULT_BOOK.to_string());
        let book = if storage.exists(&book_name) {
            storage.load(&book_name)?
        } else {
            RecordBook::new(&book_name)
        };

        Ok(Self {
            mode,
            running: true,
            book,
            book_name,
            dirty: false,
            config,
            config_manager,
            storage: Box::new(storage),
            clock,
            registry: commands::registry(),
        })
    }

    pub fn prompt(&self) -> String {
        let marker = if self.dirty { "*" } else { "" };
        format!("recurring({}{})> ", self.book_name, marker)
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    pub fn generator(&self) -> GenerationService {
        GenerationService::new(self.config.advance_policy(), self.config.max_catch_up)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Persists the open book and remembers it as the last opened one.
    pub fn save(&mut self) -> Result<(), RecurringError> {
        self.storage.save(&self.book, &self.book_name)?;
        self.dirty = false;
        if self.config.last_opened_book.as_deref() != Some(self.book_name.as_str()) {
            self.config.last_opened_book = Some(self.book_name.clone());
            self.config_manager.save(&self.config)?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, command: &str, args: &[&str]) -> CommandResult {
        match self.registry.get(command).map(|entry| entry.handler) {
            Some(handler) => handler(self, args),
            None => {
                self.suggest_command(command);
                Ok(LoopControl::Continue)
            }
        }
    }

    fn suggest_command(&self, input: &str) {
        output::warning(format!("Unknown command `{}`.", input));
        let best = self
            .registry
            .names()
            .map(|name| (levenshtein(name, input), name))
            .min_by_key(|(distance, _)| *distance);
        if let Some((distance, name)) = best {
            if distance <= 3 {
                output::info(format!("Suggestion: `{}`?", name));
            }
        }
    }

    pub fn report_error(&self, err: CommandError) -> Result<(), CliError> {
        match err {
            CommandError::InvalidArguments(message) => {
                output::error(message);
                if self.mode == CliMode::Interactive {
                    output::info("Use `help` for usage details.");
                }
            }
            CommandError::Core(err) => output::error(err),
        }
        Ok(())
    }
}

fn clock_from_env() -> Result<Box<dyn Clock>, CliError> {
    match env::var(NOW_ENV) {
        Ok(raw) => {
            let pinned = DateTime::parse_from_rfc3339(raw.trim())
                .map_err(|err| CliError::Input(format!("{}: {}", NOW_ENV, err)))?;
            Ok(Box::new(FixedClock(pinned.with_timezone(&Utc))))
        }
        Err(_) => Ok(Box::new(SystemClock)),
    }
}
