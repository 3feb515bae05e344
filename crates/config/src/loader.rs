//! Configuration loader implementation

use crate::schema::{Config, TrackingStrategy};
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use std::path::Path;
use types::ConfigError;

/// Configuration loader that handles YAML files and environment variables
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Config> {
        let config_path = config_path.as_ref();

        // Check if config file exists
        if !config_path.exists() {
            return Err(ConfigError::FileNotFound {
                path: config_path.display().to_string(),
            }
            .into());
        }

        let config: Config = Self::figment(Figment::new().merge(Yaml::file(config_path)))
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        // Validate the configuration
        Self::validate(&config)?;

        Ok(config)
    }

    /// Load configuration from string (for testing)
    pub fn load_from_str(yaml_content: &str) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Yaml::string(yaml_content))
            .extract()
            .context("Failed to parse configuration from string")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Layer environment overrides on top of a base figment
    fn figment(base: Figment) -> Figment {
        base
            // Nested overrides, e.g. JITO_BUNDLER_TRACKING__STRATEGY=event
            .merge(Env::prefixed("JITO_BUNDLER_").split("__"))
            // Unprefixed variables for the two endpoints
            .merge(
                Env::raw()
                    .only(&["BLOCK_ENGINE_URL"])
                    .map(|_| "relay.url".into()),
            )
            .merge(
                Env::raw()
                    .only(&["RPC_URL"])
                    .map(|_| "upstream.rpc_url".into()),
            )
    }

    /// Validate configuration
    fn validate(config: &Config) -> Result<()> {
        if config.relay.url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "relay.url".to_string(),
            }
            .into());
        }

        if !config.relay.url.starts_with("http://") && !config.relay.url.starts_with("https://") {
            return Err(ConfigError::ValidationError {
                field: "relay.url".to_string(),
                message: format!("Invalid relay URL format: {}", config.relay.url),
            }
            .into());
        }

        if config.relay.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                field: "relay.timeout_seconds".to_string(),
                message: "Timeout must be greater than 0".to_string(),
            }
            .into());
        }

        if config.tracking.strategy == TrackingStrategy::Event {
            match config.relay.ws_url.as_deref() {
                None | Some("") => {
                    return Err(ConfigError::MissingField {
                        field: "relay.ws_url".to_string(),
                    }
                    .into());
                }
                Some(url) if !url.starts_with("ws://") && !url.starts_with("wss://") => {
                    return Err(ConfigError::ValidationError {
                        field: "relay.ws_url".to_string(),
                        message: format!("Invalid WebSocket URL format: {}", url),
                    }
                    .into());
                }
                Some(_) => {}
            }
        }

        if config.upstream.rpc_url.is_empty() {
            return Err(ConfigError::MissingField {
                field: "upstream.rpc_url".to_string(),
            }
            .into());
        }

        if config.bundle.max_transactions == 0 {
            return Err(ConfigError::ValidationError {
                field: "bundle.max_transactions".to_string(),
                message: "Bundle size limit cannot be 0".to_string(),
            }
            .into());
        }

        if config.tracking.max_poll_attempts == 0 {
            return Err(ConfigError::ValidationError {
                field: "tracking.max_poll_attempts".to_string(),
                message: "At least one status query is required".to_string(),
            }
            .into());
        }

        if config.tracking.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError {
                field: "tracking.poll_interval_ms".to_string(),
                message: "Poll interval cannot be 0".to_string(),
            }
            .into());
        }

        if config.tracking.event_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                field: "tracking.event_timeout_seconds".to_string(),
                message: "Event timeout cannot be 0".to_string(),
            }
            .into());
        }

        // Validate logging configuration
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: config.logging.level.clone(),
            }
            .into());
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.format".to_string(),
                value: config.logging.format.clone(),
            }
            .into());
        }

        Ok(())
    }

    /// Get default configuration
    pub fn default() -> Config {
        Config::default()
    }

    /// Create example configuration file
    pub fn create_example<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Self::default();
        let yaml_content = serde_yaml::to_string(&config)
            .context("Failed to serialize default configuration")?;

        std::fs::write(path.as_ref(), yaml_content)
            .context("Failed to write example configuration file")?;

        Ok(())
    }
}
