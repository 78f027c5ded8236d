//! Application configuration: TOML file format, defaults, and validation.
//!
//! Configuration errors are fatal and must be surfaced before any monitor
//! starts; nothing here is re-validated or torn down mid-run.

use serde::{Deserialize, Serialize};

/// Complete application configuration.
///
/// # Example TOML
///
/// ```toml
/// env = "development"
///
/// [mqtt]
/// host = "broker.local"
/// port = 1883
///
/// [monitoring]
/// poll_interval_ms_default = 100
///
/// [[machines]]
/// machine_id = "m1"
/// ip = "10.0.0.1"
///
/// [[machines.monitored_paths]]
/// path = 1
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// `development` selects the simulated controller client; `production`
    /// selects the worker-thread (native) client.
    #[serde(default = "default_env")]
    pub env: Environment,

    pub mqtt: MqttConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,

    pub machines: Vec<MachineConfig>,
}

fn default_env() -> Environment {
    Environment::Development
}

/// Deployment environment, selecting which controller client to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// MQTT broker connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MqttConfig {
    pub host: String,

    #[serde(default = "default_mqtt_port")]
    pub port: u16,

    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default)]
    pub tls: bool,
}

fn default_mqtt_port() -> u16 {
    1883
}

/// Monitoring behavior defaults, shared across machines unless overridden.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms_default: u64,

    #[serde(default = "default_debounce")]
    pub debounce_consecutive_reads: u32,

    #[serde(default = "default_heartbeat_interval_s")]
    pub heartbeat_interval_s: u64,

    #[serde(default = "default_reconnect_min_delay_s")]
    pub reconnect_min_delay_s: f64,

    #[serde(default = "default_reconnect_max_delay_s")]
    pub reconnect_max_delay_s: f64,
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_debounce() -> u32 {
    2
}

fn default_heartbeat_interval_s() -> u64 {
    2
}

fn default_reconnect_min_delay_s() -> f64 {
    0.5
}

fn default_reconnect_max_delay_s() -> f64 {
    30.0
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms_default: default_poll_interval_ms(),
            debounce_consecutive_reads: default_debounce(),
            heartbeat_interval_s: default_heartbeat_interval_s(),
            reconnect_min_delay_s: default_reconnect_min_delay_s(),
            reconnect_max_delay_s: default_reconnect_max_delay_s(),
        }
    }
}

/// One monitored CNC machine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MachineConfig {
    pub machine_id: String,
    pub ip: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Overrides `monitoring.poll_interval_ms_default` for this machine.
    pub poll_interval_ms: Option<u64>,

    pub monitored_paths: Vec<PathConfig>,
}

fn default_port() -> u16 {
    8193
}

/// One monitored tool-path on a machine.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct PathConfig {
    pub path: u32,
}

/// Configuration error: either the file couldn't be read/parsed, or its
/// contents failed validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Validation(String),
}

impl Config {
    /// Load configuration from a TOML file and validate it.
    #[cfg(feature = "cli")]
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string and validate it.
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every required field and invariant. Called automatically by
    /// `parse`; exposed separately so callers constructing a `Config` by
    /// hand (tests, programmatic setups) can validate it too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mqtt.host.is_empty() {
            return Err(ConfigError::Validation("mqtt.host is required".into()));
        }
        if self.machines.is_empty() {
            return Err(ConfigError::Validation(
                "at least one machine must be configured".into(),
            ));
        }
        for machine in &self.machines {
            if machine.machine_id.is_empty() {
                return Err(ConfigError::Validation("machine_id is required".into()));
            }
            if machine.ip.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "machine {}: ip is required",
                    machine.machine_id
                )));
            }
            if machine.monitored_paths.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "machine {}: monitored_paths must not be empty",
                    machine.machine_id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_toml() -> &'static str {
        r#"
env = "development"

[mqtt]
host = "broker.local"

[[machines]]
machine_id = "m1"
ip = "10.0.0.1"

[[machines.monitored_paths]]
path = 1
"#
    }

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::parse(valid_toml()).unwrap();
        assert_eq!(config.env, Environment::Development);
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.monitoring.poll_interval_ms_default, 100);
        assert_eq!(config.monitoring.debounce_consecutive_reads, 2);
        assert_eq!(config.machines[0].port, 8193);
    }

    #[test]
    fn rejects_missing_mqtt_host() {
        let toml = r#"
[mqtt]
host = ""

[[machines]]
machine_id = "m1"
ip = "10.0.0.1"

[[machines.monitored_paths]]
path = 1
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn rejects_empty_machines() {
        let toml = r#"
[mqtt]
host = "broker.local"
machines = []
"#;
        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn rejects_machine_with_no_monitored_paths() {
        let toml = r#"
[mqtt]
host = "broker.local"

[[machines]]
machine_id = "m1"
ip = "10.0.0.1"
monitored_paths = []
"#;
        assert!(Config::parse(toml).is_err());
    }
}
