//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

use serde::Deserialize;

use crate::bus::MessagingConfig;
use crate::simulator::SimulatorConfig;
use crate::storage::StorageConfig;
use crate::ui::UiConfig;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "SHOPSTREAM_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "SHOPSTREAM";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "SHOPSTREAM_LOG";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Broker configuration.
    pub messaging: MessagingConfig,
    /// Event store configuration.
    pub storage: StorageConfig,
    /// Replay API server configuration.
    pub api: ApiConfig,
    /// Replay UI configuration.
    pub ui: UiConfig,
    /// Event simulator configuration.
    pub simulator: SimulatorConfig,
}

/// Replay API server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Host to bind to.
    pub host: String,
    /// Port to bind to.
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 3. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load() -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ::config::ConfigError> {
        use ::config::{Config as ConfigLib, File, FileFormat};

        ConfigLib::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MessagingType;
    use crate::simulator::SinkType;
    use crate::storage::StorageType;
    use serial_test::serial;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.messaging.messaging_type, MessagingType::Amqp);
        assert_eq!(config.storage.storage_type, StorageType::EventStoreDb);
        assert_eq!(config.api.port, 8000);
        assert_eq!(config.ui.port, 5000);
        assert_eq!(config.ui.replay_api_url, "http://localhost:8000/replay");
        assert_eq!(config.simulator.sink, SinkType::Store);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
messaging:
  type: amqp
  amqp:
    url: amqp://rabbit:5672
    durable: true

storage:
  type: eventstoredb
  eventstoredb:
    connection_string: esdb://esdb:2113?tls=false

api:
  port: 9000

simulator:
  sink: broker
  interval_min_ms: 0
  interval_max_ms: 5
  max_events: 100
"#;

        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.messaging.amqp.url, "amqp://rabbit:5672");
        assert!(config.messaging.amqp.durable);
        // Unset fields keep their defaults
        assert_eq!(config.messaging.amqp.exchange, "ecommerce-exchange");
        assert_eq!(
            config.storage.eventstoredb.connection_string,
            "esdb://esdb:2113?tls=false"
        );
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.api.host, "0.0.0.0");
        assert_eq!(config.simulator.sink, SinkType::Broker);
        assert_eq!(config.simulator.max_events, Some(100));
    }

    #[test]
    fn test_memory_backends_parse() {
        let yaml = r#"
messaging:
  type: memory
storage:
  type: memory
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.messaging.messaging_type, MessagingType::Memory);
        assert_eq!(config.storage.storage_type, StorageType::Memory);
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("SHOPSTREAM__API__PORT", "8123");
        std::env::set_var("SHOPSTREAM__UI__REPLAY_API_URL", "http://api:8123/replay");

        let config = Config::load();

        std::env::remove_var("SHOPSTREAM__API__PORT");
        std::env::remove_var("SHOPSTREAM__UI__REPLAY_API_URL");

        let config = config.unwrap();
        assert_eq!(config.api.port, 8123);
        assert_eq!(config.ui.replay_api_url, "http://api:8123/replay");
    }
}
