//! Runtime configuration: a YAML document layered with `AEMET_ETL__*`
//! environment overrides, plus the credentials read from the environment.

use crate::utils::get_env_var;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";
pub const ENV_PREFIX: &str = "AEMET_ETL";
pub const API_KEY_VAR: &str = "AEMET_API_KEY";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

pub const RAW_FILE_NAME: &str = "temperaturas_historicas_todas.csv";
pub const CLEANED_FILE_NAME: &str = "temperaturas_limpias.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration")]
    Load(#[from] config::ConfigError),

    #[error("Configuration file '{0}' does not exist")]
    FileNotFound(PathBuf),

    #[error("Environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("Threshold configured for {0}")]
    UnknownField(#[from] crate::types::observation::UnknownField),

    #[error("Threshold for '{field}' has min {min} greater than max {max}")]
    InvalidBounds { field: String, min: f64, max: f64 },

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: &'static str, reason: String },
}

// --- Sections ---

/// Validity band of one numeric field. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Bounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub base_url: String,
    pub lookback_days: i64,
    pub window_days: i64,
    pub request_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://opendata.aemet.es/opendata".to_string(),
            lookback_days: 730,
            window_days: 180,
            request_delay_ms: 1500,
            timeout_secs: 15,
        }
    }
}

impl ExtractionSettings {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CleaningSettings {
    pub gap_threshold: usize,
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self { gap_threshold: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoadSettings {
    pub chunk_size: usize,
    pub table: String,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            chunk_size: 10_000,
            table: "datos_meteorologicos".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub data_dir: PathBuf,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

impl PathSettings {
    /// The append-only raw incremental CSV.
    pub fn raw_store(&self) -> PathBuf {
        self.data_dir.join(RAW_FILE_NAME)
    }

    /// The cleaned audit CSV, rewritten on every cleaning run.
    pub fn cleaned_file(&self) -> PathBuf {
        self.data_dir.join(CLEANED_FILE_NAME)
    }
}

// --- Root document ---

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EtlConfig {
    /// Per-field validity bands keyed by field name (`tmin`, `hr_media`, ...).
    pub thresholds: HashMap<String, Bounds>,
    pub extraction: ExtractionSettings,
    pub retry: RetrySettings,
    pub cleaning: CleaningSettings,
    pub load: LoadSettings,
    pub paths: PathSettings,
    /// Extra raw province spellings mapped to a canonical province label.
    pub province_aliases: HashMap<String, String>,
}

impl EtlConfig {
    /// Loads the configuration document and applies environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `config/config.yaml` is used
    /// if present, then `<user config dir>/aemet-etl/config.yaml`; when neither
    /// exists the built-in defaults apply (still subject to env overrides).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::FileNotFound(p.to_path_buf()));
                }
                builder = builder.add_source(config::File::from(p).required(true));
            }
            None => {
                if let Some(p) = default_config_file() {
                    builder = builder.add_source(config::File::from(p.as_path()).required(false));
                }
            }
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: EtlConfig = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.extraction.window_days < 1 {
            return Err(ConfigError::InvalidSetting {
                key: "extraction.window_days",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.extraction.lookback_days < 0 {
            return Err(ConfigError::InvalidSetting {
                key: "extraction.lookback_days",
                reason: "must not be negative".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "retry.max_attempts",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.load.chunk_size == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "load.chunk_size",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn default_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(DEFAULT_CONFIG_PATH);
    if local.exists() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("aemet-etl").join("config.yaml"))
        .filter(|p| p.exists())
}

/// Credentials for the provider and the store, read from the environment.
#[derive(Debug, Clone)]
pub struct Credentials;

impl Credentials {
    pub fn api_key() -> Result<String, ConfigError> {
        get_env_var(API_KEY_VAR)
    }

    pub fn database_url() -> Result<String, ConfigError> {
        get_env_var(DATABASE_URL_VAR)
    }
}
