//! Configuration management with validation and defaults
//!
//! Loaded from an optional TOML file, then overridden by `FAIRDRAW_*`
//! environment variables, then validated.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::common::types::TenantId;
use crate::errors::{ConfigurationError, LotteryResult};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LotteryConfig {
    pub storage: StorageConfig,
    pub fairness: FairnessConfig,
    pub operations: OperationsConfig,
    pub monitoring: MonitoringConfig,
    /// Schedules used when a draw is created lazily by the first ticket
    pub schedules: Vec<DrawScheduleConfig>,
    /// Empty means every tenant may use every registered game and play type
    pub entitlements: Vec<TenantEntitlementConfig>,
}

/// Storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_directory: String,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
    pub write_buffer_size_mb: usize,
    pub compression: CompressionType,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./DB/fairdraw".to_string(),
            clear_on_start: false,
            write_buffer_size_mb: 64,
            compression: CompressionType::Lz4,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FairnessConfig {
    /// Added on top of the time remaining until the draw when storing a secret seed
    pub seed_ttl_margin_secs: u64,
}

impl Default for FairnessConfig {
    fn default() -> Self {
        Self {
            seed_ttl_margin_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationsConfig {
    /// Deadline for every exposed operation
    pub timeout_ms: u64,
}

impl Default for OperationsConfig {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_metrics: bool,
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: true,
            log_level: LogLevel::Info,
        }
    }
}

/// Periodic draw windows for one game, aligned to the Unix epoch
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrawScheduleConfig {
    pub game_code: String,
    /// Length of one draw cycle; sales open at the start of the cycle, the draw happens at its end
    pub period_secs: u64,
    /// Sales close this long before the draw
    pub sales_close_lead_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantEntitlementConfig {
    pub tenant_id: TenantId,
    pub games: Vec<GameEntitlementConfig>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntitlementConfig {
    pub game_code: String,
    /// Empty means every play type of the game
    #[serde(default)]
    pub play_types: Vec<String>,
}

impl LotteryConfig {
    /// Configuration for tests and the CLI simulation
    pub fn for_testing(data_directory: &str) -> Self {
        let mut config = Self::default();
        config.storage.data_directory = data_directory.to_string();
        config.storage.clear_on_start = true;
        config.schedules = vec![
            DrawScheduleConfig {
                game_code: "lotto".to_string(),
                period_secs: 3600,
                sales_close_lead_secs: 300,
            },
            DrawScheduleConfig {
                game_code: "daily5".to_string(),
                period_secs: 600,
                sales_close_lead_secs: 60,
            },
        ];
        config
    }

    pub fn schedule_for(&self, game_code: &str) -> Option<&DrawScheduleConfig> {
        self.schedules.iter().find(|s| s.game_code == game_code)
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> LotteryResult<LotteryConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => LotteryConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        self.validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> LotteryResult<LotteryConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut LotteryConfig) -> LotteryResult<()> {
        if let Ok(dir) = env::var("FAIRDRAW_DATA_DIR") {
            config.storage.data_directory = dir;
        }
        if let Ok(timeout) = env::var("FAIRDRAW_OPERATION_TIMEOUT_MS") {
            config.operations.timeout_ms = timeout.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "FAIRDRAW_OPERATION_TIMEOUT_MS".to_string(),
                value: timeout,
                reason: "Invalid timeout value".to_string(),
            })?;
        }
        if let Ok(margin) = env::var("FAIRDRAW_SEED_TTL_MARGIN_SECS") {
            config.fairness.seed_ttl_margin_secs = margin.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "FAIRDRAW_SEED_TTL_MARGIN_SECS".to_string(),
                value: margin,
                reason: "Invalid number of seconds".to_string(),
            })?;
        }
        if let Ok(level) = env::var("FAIRDRAW_LOG_LEVEL") {
            config.monitoring.log_level = level.parse().map_err(|reason| ConfigurationError::InvalidValue {
                field: "FAIRDRAW_LOG_LEVEL".to_string(),
                value: level.clone(),
                reason,
            })?;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self, config: &LotteryConfig) -> LotteryResult<()> {
        if config.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if config.operations.timeout_ms < 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "operations.timeout_ms".to_string(),
                value: config.operations.timeout_ms.to_string(),
                reason: "Timeout must be at least 100ms".to_string(),
            }
            .into());
        }

        for schedule in &config.schedules {
            if schedule.period_secs == 0 || schedule.sales_close_lead_secs >= schedule.period_secs {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("schedules.{}", schedule.game_code),
                    value: format!("{}/{}", schedule.period_secs, schedule.sales_close_lead_secs),
                    reason: "Sales close lead must be shorter than a non-zero period".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }

    pub fn save(&self, config: &LotteryConfig, path: &str) -> LotteryResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

/// Write a sample configuration file
pub fn generate_sample_config(path: &str) -> LotteryResult<()> {
    let config = LotteryConfig::for_testing("./DB/fairdraw");
    ConfigLoader::new().save(&config, path)
}
