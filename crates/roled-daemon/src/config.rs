//! Configuration for roled-daemon

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main daemon configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Gateway backend configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Directory where per-community policy documents are stored
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Scheduler configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            data_dir: default_data_dir(),
            scheduler: SchedulerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Gateway backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum GatewayConfig {
    /// In-memory gateway (for development/testing)
    Memory,

    /// Remote chat-platform gateway
    Remote {
        /// Credential token for the platform API
        token: String,
    },
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig::Memory
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between background reconciliation sweeps, in seconds
    #[serde(default = "default_background_interval")]
    pub background_interval_secs: u64,

    /// Capacity of the user-triggered reconciliation queue
    #[serde(default = "default_trigger_capacity")]
    pub trigger_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            background_interval_secs: default_background_interval(),
            trigger_capacity: default_trigger_capacity(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_background_interval() -> u64 {
    60
}

fn default_trigger_capacity() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration from file and environment.
    ///
    /// An explicitly named configuration file must exist; without one the
    /// daemon falls back to defaults plus `ROLED_*` environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(true));
        } else {
            builder = builder.add_source(config::File::with_name("roled").required(false));
        }

        // Add environment variables with ROLED_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("ROLED")
                .separator("_")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
