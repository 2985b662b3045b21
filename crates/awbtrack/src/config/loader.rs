use std::path::Path;

use crate::config::schema::Config;
use crate::engine::PacingInterval;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Applies `AWBTRACK_*` overrides on top of a loaded config. `get` looks a
/// variable up; the server passes `std::env::var`.
pub fn apply_env_overrides<F>(config: &mut Config, get: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = get("AWBTRACK_HOST") {
        config.server.host = host;
    }
    if let Some(port) = get("AWBTRACK_PORT") {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            name: "AWBTRACK_PORT".to_string(),
            value: port.clone(),
        })?;
    }
    if let Some(path) = get("AWBTRACK_DATABASE") {
        config.database.path = Some(path);
    }
    if let Some(endpoint) = get("AWBTRACK_LOOKUP_ENDPOINT") {
        config.lookup.endpoint = endpoint;
    }
    if let Some(json) = get("AWBTRACK_LOG_JSON") {
        config.logging.json = match json.to_lowercase().as_str() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            _ => {
                return Err(ConfigError::InvalidEnv {
                    name: "AWBTRACK_LOG_JSON".to_string(),
                    value: json,
                })
            }
        };
    }

    validate_config(config)
}

pub(crate) fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    let pacing = config.engine.default_pacing_ms;
    if !(PacingInterval::MIN_MS..=PacingInterval::MAX_MS).contains(&pacing) {
        return Err(ConfigError::Validation {
            message: format!(
                "engine.default_pacing_ms must be between {} and {}, got {}",
                PacingInterval::MIN_MS,
                PacingInterval::MAX_MS,
                pacing
            ),
        });
    }

    if config.engine.identifier_column.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "engine.identifier_column must not be empty".to_string(),
        });
    }

    if config.engine.event_buffer == 0 {
        return Err(ConfigError::Validation {
            message: "engine.event_buffer must be at least 1".to_string(),
        });
    }

    if !config.lookup.endpoint.starts_with("http://")
        && !config.lookup.endpoint.starts_with("https://")
    {
        return Err(ConfigError::Validation {
            message: format!(
                "lookup.endpoint must be an http(s) URL, got '{}'",
                config.lookup.endpoint
            ),
        });
    }

    Ok(())
}
