//! Configuration for the vent bridge service
//!
//! Loaded from an optional YAML file with `VENTSRV_`-prefixed environment
//! variable overrides on top of compiled-in defaults.

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use vent_modbus::SerialSettings;

use crate::error::{Result, VentsrvError};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Serial bus line settings
    #[serde(default)]
    pub serial: SerialSettings,

    /// Bus scheduling configuration
    #[serde(default)]
    pub bus: BusConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Bind host
    #[serde(default = "default_host")]
    pub host: String,

    /// Service port
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Bus scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Delay between consecutive queries in a bulk status run, in
    /// milliseconds. Keeps the half-duplex line from saturating.
    #[serde(default = "default_pacing_delay_ms")]
    pub pacing_delay_ms: u64,
}

impl Config {
    /// Load configuration from an optional YAML file plus environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        figment = match path {
            Some(path) => figment.merge(Yaml::file(path)),
            None => figment.merge(Yaml::file("config/ventsrv.yaml")),
        };

        figment
            .merge(Env::prefixed("VENTSRV_").split("_"))
            .extract()
            .map_err(|e| VentsrvError::ConfigError(format!("Failed to load config: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            service: ServiceConfig::default(),
            serial: SerialSettings::default(),
            bus: BusConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            name: default_service_name(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        BusConfig {
            pacing_delay_ms: default_pacing_delay_ms(),
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    "ventsrv".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    6090
}

fn default_pacing_delay_ms() -> u64 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}
