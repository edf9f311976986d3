//! Service configuration, read from `IDENTITY__*` environment variables

use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

use crate::engine::EngineConfig;

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Where the three stores live
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct EngineSettings {
    pub worker_pool_size: usize,
    pub fanout_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageBackend,
    pub engine: EngineSettings,
}

impl AppConfig {
    /// Defaults overlaid with the environment, e.g. `IDENTITY__SERVER__PORT=8080`
    pub fn load() -> Result<Self, ConfigError> {
        let config: AppConfig = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3002)?
            .set_default("storage", "postgres")?
            .set_default("engine.worker_pool_size", 5)?
            .set_default("engine.fanout_timeout_ms", 500)?
            .add_source(
                Environment::with_prefix("IDENTITY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        if config.engine.worker_pool_size == 0 {
            return Err(ConfigError::Message(
                "engine.worker_pool_size must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            worker_pool_size: self.engine.worker_pool_size,
            fanout_timeout: Duration::from_millis(self.engine.fanout_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: [&str; 4] = [
        "IDENTITY__SERVER__PORT",
        "IDENTITY__STORAGE",
        "IDENTITY__ENGINE__WORKER_POOL_SIZE",
        "IDENTITY__ENGINE__FANOUT_TIMEOUT_MS",
    ];

    fn clear() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    #[test]
    #[serial]
    fn test_defaults() {
        clear();

        let config = AppConfig::load().unwrap();
        assert_eq!(config.server.address(), "0.0.0.0:3002");
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.engine_config(), EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        clear();
        unsafe {
            env::set_var("IDENTITY__SERVER__PORT", "8080");
            env::set_var("IDENTITY__STORAGE", "memory");
            env::set_var("IDENTITY__ENGINE__WORKER_POOL_SIZE", "12");
            env::set_var("IDENTITY__ENGINE__FANOUT_TIMEOUT_MS", "50");
        }

        let config = AppConfig::load().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.engine_config().worker_pool_size, 12);
        assert_eq!(
            config.engine_config().fanout_timeout,
            Duration::from_millis(50)
        );

        clear();
    }

    #[test]
    #[serial]
    fn test_zero_pool_size_is_rejected() {
        clear();
        unsafe {
            env::set_var("IDENTITY__ENGINE__WORKER_POOL_SIZE", "0");
        }

        assert!(AppConfig::load().is_err());

        clear();
    }
}
