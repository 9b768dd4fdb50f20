//! Application and scheduler configuration.
//!
//! Values come from `config.toml` (or `CONFIG_PATH`), then `.env`/environment,
//! then the defaults below. Nothing here is global: the loaded `AppConfig` is
//! handed to whoever needs it.

use serde::Deserialize;
use std::path::PathBuf;

use crate::srs::SchedulerError;

// ==================== File Structure ====================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    database: Option<DatabaseSection>,
    server: Option<ServerSection>,
    study: Option<StudySection>,
    scheduler: Option<SchedulerConfig>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    addr: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct StudySection {
    max_new_per_day: Option<u32>,
}

// ==================== Defaults ====================

pub const DEFAULT_DATABASE_PATH: &str = "data/flashdeck.db";

pub const SERVER_ADDR: &str = "0.0.0.0";

pub const SERVER_PORT: u16 = 3000;

/// Cap on never-seen items introduced per calendar day
pub const DEFAULT_MAX_NEW_PER_DAY: u32 = 20;

/// Learning steps in minutes: 1min → 10min
pub const LEARNING_STEPS: [i64; 2] = [1, 10];

/// Relearning steps in minutes after a lapse
pub const RELEARNING_STEPS: [i64; 1] = [10];

// ==================== Scheduler Configuration ====================

/// Tunable parameters of the review state machine.
///
/// Steps are in minutes, intervals in days.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub learning_steps: Vec<i64>,
    pub relearning_steps: Vec<i64>,
    pub graduating_interval: f64,
    pub easy_bonus: f64,
    pub hard_interval_factor: f64,
    pub min_ease: f64,
    pub default_ease: f64,
    /// Ease change on Easy (and half of it on Hard) while in Review
    pub ease_delta: f64,
    /// Ease subtracted on a lapse
    pub lapse_ease_delta: f64,
    /// Fraction of the pre-lapse interval kept when relearning completes
    pub relearn_interval_factor: f64,
    pub maximum_interval: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            learning_steps: LEARNING_STEPS.to_vec(),
            relearning_steps: RELEARNING_STEPS.to_vec(),
            graduating_interval: 1.0,
            easy_bonus: 1.3,
            hard_interval_factor: 1.2,
            min_ease: 1.3,
            default_ease: 2.5,
            ease_delta: 0.15,
            lapse_ease_delta: 0.2,
            relearn_interval_factor: 0.5,
            maximum_interval: 36500.0,
        }
    }
}

impl SchedulerConfig {
    /// Reject configurations the state machine cannot honor
    pub fn validate(&self) -> Result<(), SchedulerError> {
        check_steps("learning_steps", &self.learning_steps)?;
        check_steps("relearning_steps", &self.relearning_steps)?;

        check_positive("graduating_interval", self.graduating_interval)?;
        check_positive("easy_bonus", self.easy_bonus)?;
        check_positive("hard_interval_factor", self.hard_interval_factor)?;
        check_positive("maximum_interval", self.maximum_interval)?;

        if self.easy_bonus < 1.0 {
            return Err(config_error(format!(
                "easy_bonus must be at least 1.0, got {}",
                self.easy_bonus
            )));
        }
        if !self.min_ease.is_finite() || self.min_ease < 1.0 {
            return Err(config_error(format!(
                "min_ease must be at least 1.0, got {}",
                self.min_ease
            )));
        }
        if !self.default_ease.is_finite() || self.default_ease < self.min_ease {
            return Err(config_error(format!(
                "default_ease {} is below min_ease {}",
                self.default_ease, self.min_ease
            )));
        }
        for (name, delta) in [
            ("ease_delta", self.ease_delta),
            ("lapse_ease_delta", self.lapse_ease_delta),
        ] {
            if !delta.is_finite() || delta < 0.0 {
                return Err(config_error(format!("{} must be non-negative, got {}", name, delta)));
            }
        }
        if !(0.0..=1.0).contains(&self.relearn_interval_factor) {
            return Err(config_error(format!(
                "relearn_interval_factor must be within [0, 1], got {}",
                self.relearn_interval_factor
            )));
        }
        if self.maximum_interval < self.graduating_interval {
            return Err(config_error(format!(
                "maximum_interval {} is below graduating_interval {}",
                self.maximum_interval, self.graduating_interval
            )));
        }
        Ok(())
    }
}

fn config_error(message: String) -> SchedulerError {
    SchedulerError::ConfigurationError(message)
}

fn check_steps(name: &str, steps: &[i64]) -> Result<(), SchedulerError> {
    if steps.is_empty() {
        return Err(config_error(format!("{} must not be empty", name)));
    }
    if let Some(step) = steps.iter().find(|s| **s <= 0) {
        return Err(config_error(format!(
            "{} must contain positive minutes, got {}",
            name, step
        )));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<(), SchedulerError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(config_error(format!("{} must be positive, got {}", name, value)));
    }
    Ok(())
}

// ==================== Application Configuration ====================

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub server_addr: String,
    pub server_port: u16,
    pub max_new_per_day: u32,
    pub scheduler: SchedulerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            server_addr: SERVER_ADDR.to_string(),
            server_port: SERVER_PORT,
            max_new_per_day: DEFAULT_MAX_NEW_PER_DAY,
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Get the full server bind address
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_addr, self.server_port)
    }

    /// Parse a config file body, filling gaps with defaults
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: ConfigFile) -> Self {
        let mut config = Self::default();
        if let Some(path) = file.database.and_then(|db| db.path) {
            config.database_path = PathBuf::from(path);
        }
        if let Some(server) = file.server {
            if let Some(addr) = server.addr {
                config.server_addr = addr;
            }
            if let Some(port) = server.port {
                config.server_port = port;
            }
        }
        if let Some(max) = file.study.and_then(|s| s.max_new_per_day) {
            config.max_new_per_day = max;
        }
        if let Some(scheduler) = file.scheduler {
            config.scheduler = scheduler;
        }
        config
    }
}

/// Load configuration with priority: config.toml > .env/environment > default
pub fn load_config() -> AppConfig {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());

    let mut from_file_db_path = false;
    let mut config = match std::fs::read_to_string(&config_path) {
        Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
            Ok(file) => {
                from_file_db_path = file.database.as_ref().is_some_and(|db| db.path.is_some());
                tracing::info!("Loaded configuration from {}", config_path);
                AppConfig::from_file(file)
            }
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", config_path, e);
                AppConfig::default()
            }
        },
        Err(_) => AppConfig::default(),
    };

    if !from_file_db_path {
        if let Ok(path) = std::env::var("DATABASE_PATH") {
            tracing::info!("Using database from DATABASE_PATH env: {}", path);
            config.database_path = PathBuf::from(path);
        }
    }

    if let Ok(port) = std::env::var("SERVER_PORT") {
        match port.parse() {
            Ok(port) => config.server_port = port,
            Err(_) => tracing::warn!("Ignoring invalid SERVER_PORT '{}'", port),
        }
    }

    tracing::info!("Using database path: {}", config.database_path.display());
    config
}
