// Calculator Configuration
//
// Explicit, immutable runtime settings. Built once at startup from the
// environment and passed into the engine.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::numeric::MAX_PRECISION;

pub const DEFAULT_PRECISION: u32 = 4;
pub const DEFAULT_MAX_HISTORY_SIZE: usize = 1_000;
pub const DEFAULT_ENCODING: &str = "utf-8";

const TRUE_VALUES: [&str; 5] = ["1", "true", "yes", "y", "on"];
const FALSE_VALUES: [&str; 5] = ["0", "false", "no", "n", "off"];

/// Errors detected while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be boolean-like, got {value:?}")]
    InvalidBool { key: &'static str, value: String },

    #[error("{key} must be an integer, got {value:?}")]
    InvalidInteger { key: &'static str, value: String },

    #[error("{key} must be a decimal number, got {value:?}")]
    InvalidDecimal { key: &'static str, value: String },

    #[error("{key} must be > 0, got {value}")]
    NotPositive { key: &'static str, value: String },

    #[error("precision must be at most {max}, got {value}")]
    PrecisionTooLarge { value: u32, max: u32 },

    #[error("unsupported encoding {0:?}: only utf-8 is supported")]
    UnsupportedEncoding(String),

    #[error("cannot create directory {}: {source}", path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Runtime settings for the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalculatorConfig {
    pub base_dir: PathBuf,
    pub log_dir: PathBuf,
    pub history_dir: PathBuf,
    pub log_file: PathBuf,
    pub history_file: PathBuf,
    pub auto_save: bool,
    pub max_history_size: usize,
    /// Fractional digits kept on every result.
    pub precision: u32,
    pub max_input_value: Decimal,
    pub default_encoding: String,
}

impl CalculatorConfig {
    /// Defaults rooted at `base_dir`.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let log_dir = base_dir.join("logs");
        let history_dir = base_dir.join("history");

        Self {
            log_file: log_dir.join("calculator.log"),
            history_file: history_dir.join("calculator_history.csv"),
            base_dir,
            log_dir,
            history_dir,
            auto_save: true,
            max_history_size: DEFAULT_MAX_HISTORY_SIZE,
            precision: DEFAULT_PRECISION,
            max_input_value: Decimal::MAX,
            default_encoding: DEFAULT_ENCODING.into(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    ///
    /// Unset variables fall back to defaults; malformed ones are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_dir = match lookup("CALCULATOR_BASE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        let log_dir = lookup("CALCULATOR_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("logs"));
        let history_dir = lookup("CALCULATOR_HISTORY_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| base_dir.join("history"));
        let log_file = lookup("CALCULATOR_LOG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| log_dir.join("calculator.log"));
        let history_file = lookup("CALCULATOR_HISTORY_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| history_dir.join("calculator_history.csv"));

        let config = Self {
            base_dir,
            log_dir,
            history_dir,
            log_file,
            history_file,
            auto_save: env_bool(&lookup, "CALCULATOR_AUTO_SAVE", true)?,
            max_history_size: env_positive(
                &lookup,
                "CALCULATOR_MAX_HISTORY_SIZE",
                DEFAULT_MAX_HISTORY_SIZE,
            )?,
            precision: env_positive(&lookup, "CALCULATOR_PRECISION", DEFAULT_PRECISION)?,
            max_input_value: env_decimal(&lookup, "CALCULATOR_MAX_INPUT_VALUE", Decimal::MAX)?,
            default_encoding: lookup("CALCULATOR_DEFAULT_ENCODING")
                .unwrap_or_else(|| DEFAULT_ENCODING.into()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_history_size == 0 {
            return Err(ConfigError::NotPositive {
                key: "max_history_size",
                value: "0".into(),
            });
        }
        if self.precision == 0 {
            return Err(ConfigError::NotPositive {
                key: "precision",
                value: "0".into(),
            });
        }
        if self.precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooLarge {
                value: self.precision,
                max: MAX_PRECISION,
            });
        }
        if self.max_input_value <= Decimal::ZERO {
            return Err(ConfigError::NotPositive {
                key: "max_input_value",
                value: self.max_input_value.to_string(),
            });
        }

        let encoding = self.default_encoding.to_ascii_lowercase();
        if encoding != "utf-8" && encoding != "utf8" {
            return Err(ConfigError::UnsupportedEncoding(
                self.default_encoding.clone(),
            ));
        }

        Ok(())
    }

    /// Create the log and history directories, plus the parents of the
    /// configured files when those live elsewhere.
    pub fn prepare_directories(&self) -> Result<(), ConfigError> {
        let parents = [self.log_file.parent(), self.history_file.parent()];
        let dirs = [Some(self.log_dir.as_path()), Some(self.history_dir.as_path())]
            .into_iter()
            .chain(parents)
            .flatten()
            .filter(|dir| !dir.as_os_str().is_empty());

        for dir in dirs {
            ensure_dir(dir)?;
        }
        Ok(())
    }
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self::with_base_dir(".")
    }
}

impl fmt::Display for CalculatorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Calculator Config:")?;
        writeln!(f, "  auto_save          = {}", self.auto_save)?;
        writeln!(f, "  max_history_size   = {}", self.max_history_size)?;
        writeln!(f, "  precision          = {}", self.precision)?;
        writeln!(f, "  max_input_value    = {}", self.max_input_value)?;
        writeln!(f, "  log_file           = {}", self.log_file.display())?;
        write!(f, "  history_file       = {}", self.history_file.display())
    }
}

fn ensure_dir(path: &Path) -> Result<(), ConfigError> {
    fs::create_dir_all(path).map_err(|source| ConfigError::Directory {
        path: path.to_path_buf(),
        source,
    })
}

fn env_bool<F>(lookup: &F, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let lowered = raw.trim().to_ascii_lowercase();
    if TRUE_VALUES.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE_VALUES.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(ConfigError::InvalidBool { key, value: raw })
    }
}

fn env_positive<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: TryFrom<i64>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let value: i64 = raw
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidInteger {
            key,
            value: raw.clone(),
        })?;
    if value <= 0 {
        return Err(ConfigError::NotPositive {
            key,
            value: value.to_string(),
        });
    }
    T::try_from(value).map_err(|_| ConfigError::InvalidInteger { key, value: raw })
}

fn env_decimal<F>(lookup: &F, key: &'static str, default: Decimal) -> Result<Decimal, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ConfigError::InvalidDecimal { key, value: raw })
}
