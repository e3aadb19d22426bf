use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;

use crate::coordinator::MonitorConfig;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub transport: TransportConfig,
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    /// Broker host, host:port, or full amqp:// URI (e.g. "localhost")
    pub host: String,
    /// Shared queue every agent publishes its state to
    pub state_queue: String,
    /// Per-queue buffer size
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_queue_capacity() -> usize {
    1024
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            state_queue: "robot_states".to_string(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Interval between moves/state reports (ms)
    pub tick_ms: u64,
    /// Battery level every simulated robot starts with
    pub initial_battery: i64,
    /// Delay before robots start moving, so the monitor is subscribed first (ms)
    pub startup_delay_ms: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            initial_battery: 100,
            startup_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Enable JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a specific directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let mut builder = Config::builder()
            // Start with default values
            .set_default("transport.host", "localhost")?
            .set_default("transport.state_queue", "robot_states")?
            .set_default("transport.queue_capacity", 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("MONITOR_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (MONITOR_TRANSPORT__STATE_QUEUE, etc.)
            .add_source(
                Environment::with_prefix("MONITOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        // Variables used by existing deployments of the agent fleet
        if let Ok(host) = std::env::var("RABBITMQ_HOST") {
            builder = builder.set_override("transport.host", host)?;
        }
        if let Ok(queue) = std::env::var("RABBITMQ_QUEUE") {
            builder = builder.set_override("transport.state_queue", queue)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Built-in configuration used when no files are present
    pub fn default_config() -> Self {
        Self {
            transport: TransportConfig::default(),
            monitor: MonitorConfig::default(),
            simulator: SimulatorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.transport.state_queue.trim().is_empty() {
            errors.push("transport.state_queue must not be empty".to_string());
        }

        if self.transport.queue_capacity == 0 {
            errors.push("transport.queue_capacity must be positive".to_string());
        }

        let footprint = &self.monitor.footprint;
        if !(footprint.width > 0.0 && footprint.length > 0.0) {
            errors.push(format!(
                "footprint must have positive width and length (got {} x {})",
                footprint.width, footprint.length
            ));
        }

        if self.simulator.tick_ms == 0 {
            errors.push("simulator.tick_ms must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport.state_queue, "robot_states");
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = AppConfig::default_config();
        config.transport.state_queue = " ".to_string();
        config.transport.queue_capacity = 0;
        config.monitor.footprint.width = 0.0;
        config.simulator.tick_ms = 0;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_load_from_missing_dir_uses_defaults() {
        let dir = std::env::temp_dir().join("collision-monitor-no-such-config");
        let config = AppConfig::load_from(&dir).unwrap();
        assert_eq!(config.transport.queue_capacity, 1024);
        assert_eq!(config.logging.level, "info");
        assert!(config.monitor.footprint.threshold() > 14.0);
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = std::env::temp_dir().join(format!(
            "collision-monitor-config-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            r#"
[transport]
host = "broker.internal"
state_queue = "fleet_states"

[monitor.footprint]
width = 3.0
length = 4.0

[simulator]
tick_ms = 250
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&dir).unwrap();
        assert_eq!(config.transport.state_queue, "fleet_states");
        assert!((config.monitor.footprint.threshold() - 5.0).abs() < 1e-9);
        assert_eq!(config.simulator.tick_ms, 250);
        assert_eq!(config.simulator.initial_battery, 100);

        std::fs::remove_dir_all(&dir).ok();
    }
}
