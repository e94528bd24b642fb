use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use crate::{
    core::{
        services::generation_service::DEFAULT_MAX_CATCH_UP,
        utils::{ensure_dir, PathResolver},
    },
    errors::{RecurringError, Result},
    schedule::{AdvancePolicy, MonthStep},
};

const TMP_SUFFIX: &str = "tmp";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub month_step: MonthStep,
    pub max_catch_up: usize,
    pub backup_retention: usize,
    pub default_owner: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opened_book: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            month_step: MonthStep::Calendar,
            max_catch_up: DEFAULT_MAX_CATCH_UP,
            backup_retention: 5,
            default_owner: 1,
            last_opened_book: None,
        }
    }
}

impl Config {
    pub fn advance_policy(&self) -> AdvancePolicy {
        AdvancePolicy::new(self.month_step)
    }

    pub fn validate(&self) -> Result<()> {
        self.month_step.validate()
    }
}

/// Handles persistence of [`Config`] under the application data directory.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(PathResolver::base_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self> {
        ensure_dir(&PathResolver::config_dir_in(&base))?;
        Ok(Self {
            path: PathResolver::config_file_in(&base),
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.path
    }

    /// Loads the stored config, falling back to defaults when none exists.
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&data).map_err(|err| {
            RecurringError::ConfigError(format!("{}: {}", self.path.display(), err))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &Config) -> Result<()> {
        config.validate()?;
        let json = serde_json::to_string_pretty(config)
            .map_err(|err| RecurringError::ConfigError(err.to_string()))?;
        let mut tmp = self.path.clone();
        tmp.set_extension(format!("json.{}", TMP_SUFFIX));
        let mut file = File::create(&tmp)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
