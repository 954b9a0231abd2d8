//! Application Configuration
//!
//! Built once at process start from the environment (after `.env` is loaded)
//! and passed by reference to every component that needs it.

use crate::error::{AssistantError, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "phi3";
pub const DEFAULT_TABLE_NAME: &str = "combustiveis";

/// Settings for the Ollama model service
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
    pub temperature: f64,
    pub num_thread: u32,
    pub timeout: Duration,
}

/// Fixed-retry readiness probe run before the session starts
#[derive(Debug, Clone)]
pub struct ReadinessPolicy {
    pub retries: u32,
    pub backoff: Duration,
}

/// Column names the rewriter and prompts refer to
#[derive(Debug, Clone)]
pub struct DomainColumns {
    pub date_column: String,
    pub product_column: String,
}

impl Default for DomainColumns {
    fn default() -> Self {
        Self {
            date_column: "data_da_coleta".to_string(),
            product_column: "produto".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Location of the prepared (silver) dataset
    pub silver_path: PathBuf,

    /// Directory of bronze Parquet files, only needed by the preparation pipeline
    pub bronze_dir: Option<PathBuf>,

    pub table_name: String,
    pub model: ModelSettings,
    pub readiness: ReadinessPolicy,
    pub columns: DomainColumns,

    /// Upper bound on repair rounds after a failed execution
    pub max_repair_attempts: u8,
}

impl AppConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let silver_path = non_empty("URL_DATA_SILVER")
            .map(PathBuf::from)
            .ok_or_else(|| AssistantError::Config("URL_DATA_SILVER not set".to_string()))?;

        let model = ModelSettings {
            base_url: non_empty("OLLAMA_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: non_empty("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: parse_or(&non_empty, "OLLAMA_TEMPERATURE", 0.1)?,
            num_thread: parse_or(&non_empty, "OLLAMA_NUM_THREAD", 4)?,
            timeout: Duration::from_secs(parse_or(&non_empty, "OLLAMA_TIMEOUT_SECS", 120)?),
        };

        let readiness = ReadinessPolicy {
            retries: parse_or(&non_empty, "OLLAMA_READY_RETRIES", 5)?,
            backoff: Duration::from_secs(parse_or(&non_empty, "OLLAMA_READY_BACKOFF_SECS", 2)?),
        };

        Ok(Self {
            silver_path,
            bronze_dir: non_empty("URL_DATA_BRONZE").map(PathBuf::from),
            table_name: non_empty("FUEL_TABLE_NAME").unwrap_or_else(|| DEFAULT_TABLE_NAME.to_string()),
            model,
            readiness,
            columns: DomainColumns::default(),
            max_repair_attempts: parse_or(&non_empty, "MAX_REPAIR_ATTEMPTS", 1)?,
        })
    }

    /// Bronze directory, required by the preparation commands
    pub fn require_bronze_dir(&self) -> Result<&PathBuf> {
        self.bronze_dir
            .as_ref()
            .ok_or_else(|| AssistantError::Config("URL_DATA_BRONZE not set".to_string()))
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AssistantError::Config(format!("Invalid value for {}: '{}' ({})", key, raw, e))),
        None => Ok(default),
    }
}
