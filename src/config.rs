use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use jsonschema::{JSONSchema, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    api::types::ApiConfig,
    schedule::{BoostMode, BoostModeConfig, Mode, ScheduleError, parse_duration},
};

const EMBEDDED_SCHEMA: &str = include_str!("../slotrush.schema.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default = "default_cart_interval")]
    pub cart_interval: String,
    #[serde(default = "default_reserve_interval")]
    pub reserve_interval: String,
    #[serde(default)]
    pub home_interval: Option<String>,
    #[serde(default)]
    pub use_balance: bool,
    #[serde(default)]
    pub boost_mode: BoostModeConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_cart_interval() -> String {
    "2m".to_string()
}

fn default_reserve_interval() -> String {
    "2s".to_string()
}

fn default_enabled_true() -> bool {
    true
}

fn default_pay_type() -> u32 {
    2
}

fn default_max_attempts() -> u32 {
    30
}

fn default_retry_backoff_max() -> String {
    "5s".to_string()
}

// Congestion and sold-out rejections worth retrying inside the window.
fn default_retry_codes() -> Vec<i64> {
    vec![-3000, -3001, -3100, 40004]
}

fn default_logging_dir() -> PathBuf {
    PathBuf::from("./logs")
}

fn default_logging_filter() -> String {
    "info".to_string()
}

fn default_logging_rotation() -> LoggingRotation {
    LoggingRotation::Daily
}

fn default_logging_retention_days() -> usize {
    14
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowConfig {
    #[serde(default = "default_pay_type")]
    pub pay_type: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_backoff_max")]
    pub retry_backoff_max: String,
    #[serde(default = "default_retry_codes")]
    pub retry_codes: Vec<i64>,
    #[serde(default = "default_enabled_true")]
    pub select_all: bool,
    #[serde(default = "default_enabled_true")]
    pub wait_for_window: bool,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            pay_type: default_pay_type(),
            max_attempts: default_max_attempts(),
            retry_backoff_max: default_retry_backoff_max(),
            retry_codes: default_retry_codes(),
            select_all: true,
            wait_for_window: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LoggingRotation {
    Daily,
    Hourly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_logging_filter")]
    pub filter: String,
    #[serde(default = "default_logging_rotation")]
    pub rotation: LoggingRotation,
    #[serde(default = "default_logging_retention_days")]
    pub retention_days: usize,
    #[serde(default = "default_enabled_true")]
    pub stderr_warn_enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_logging_dir(),
            filter: default_logging_filter(),
            rotation: default_logging_rotation(),
            retention_days: default_logging_retention_days(),
            stderr_warn_enabled: true,
        }
    }
}

impl Config {
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config_value: Value = json5::from_str(&config_content)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;

        let config_base = config_path.parent().unwrap_or_else(|| Path::new("."));
        let schema = load_schema(config_base, &config_value)?;
        validate_against_schema(&config_value, &schema)?;

        let mut config: Config =
            serde_json::from_value(config_value).context("failed to deserialize config")?;

        if !config.logging.dir.is_absolute() {
            config.logging.dir = config_base.join(&config.logging.dir);
        }

        Ok(config)
    }

    /// Builds the phase scheduler, rejecting malformed cadences and
    /// out-of-order boost boundaries.
    pub fn new_mode(&self) -> Result<Mode, ScheduleError> {
        let boost_mode = BoostMode::new(&self.boost_mode)?;
        let cart_interval = parse_duration(&self.cart_interval)?;
        let reserve_interval = parse_duration(&self.reserve_interval)?;

        let mut mode = Mode::new(boost_mode, cart_interval, reserve_interval, self.use_balance);
        if let Some(home_interval) = &self.home_interval {
            mode = mode.with_home_interval(parse_duration(home_interval)?);
        }

        Ok(mode)
    }
}

fn load_schema(config_base: &Path, config_value: &Value) -> Result<Value> {
    let schema_content = match resolve_schema_path(config_base, config_value) {
        Some(schema_path) => fs::read_to_string(&schema_path)
            .with_context(|| format!("failed to read schema {}", schema_path.display()))?,
        None => EMBEDDED_SCHEMA.to_string(),
    };

    serde_json::from_str(&schema_content).context("failed to parse config schema")
}

fn resolve_schema_path(config_base: &Path, config_value: &Value) -> Option<PathBuf> {
    if let Some(path_text) = config_value.get("$schema").and_then(|value| value.as_str()) {
        let configured = PathBuf::from(path_text);
        if configured.is_absolute() {
            return Some(configured);
        }
        return Some(config_base.join(&configured));
    }

    let local_default = config_base.join("slotrush.schema.json");
    local_default.exists().then_some(local_default)
}

fn validate_against_schema(config_value: &Value, schema: &Value) -> Result<()> {
    let compiled =
        JSONSchema::compile(schema).map_err(|e| anyhow!("failed to compile schema: {e}"))?;

    match compiled.validate(config_value) {
        Ok(()) => Ok(()),
        Err(errors_iter) => {
            let validation_errors: Vec<ValidationError> = errors_iter.collect();
            let messages: Vec<String> = validation_errors
                .into_iter()
                .map(|error| error.to_string())
                .collect();
            Err(anyhow!("config validation failed: {}", messages.join("; ")))
        }
    }
}
