use crate::savings::SavingsConfig;
use crate::server::config::{LoggingConfig, ServerConfig};
use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub savings: SavingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Locations of the CSV exports backing the data provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_devices_path")]
    pub devices_path: String,
    #[serde(default = "default_savings_path")]
    pub savings_path: String,
    /// Seconds between checks for changed files; 0 loads once
    #[serde(default = "default_reload_interval_seconds")]
    pub reload_interval_seconds: u64,
}

fn default_devices_path() -> String {
    "data/devices.csv".to_string()
}

fn default_savings_path() -> String {
    "data/device-saving.csv".to_string()
}

fn default_reload_interval_seconds() -> u64 {
    60
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            devices_path: default_devices_path(),
            savings_path: default_savings_path(),
            reload_interval_seconds: default_reload_interval_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
            },
            data: DataConfig::default(),
            savings: SavingsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("SAVINGS")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(
            Environment::with_prefix("SAVINGS")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }
}
