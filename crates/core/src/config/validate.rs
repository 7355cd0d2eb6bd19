use regex_lite::Regex;

use super::{types::Config, ConfigError};
use crate::schedule::SpeedSchedule;

/// Validate configuration
///
/// Run after command line overrides are merged: the username may come from
/// either place.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.connection.username.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "connection.username is required".to_string(),
        ));
    }

    if config.connection.port == 0 {
        return Err(ConfigError::ValidationError(
            "connection.port cannot be 0".to_string(),
        ));
    }

    if config.transfer.transfer_limit == 0 {
        return Err(ConfigError::ValidationError(
            "transfer.transfer_limit cannot be 0".to_string(),
        ));
    }

    if config.transfer.connection_limit == 0 {
        return Err(ConfigError::ValidationError(
            "transfer.connection_limit cannot be 0".to_string(),
        ));
    }

    SpeedSchedule::from_map(&config.transfer.speed_schedule)
        .map_err(|e| ConfigError::ValidationError(format!("transfer.speed_schedule: {}", e)))?;

    for pattern in &config.remove_sources.exclude {
        Regex::new(pattern).map_err(|e| {
            ConfigError::ValidationError(format!(
                "remove_sources.exclude: invalid pattern '{}': {}",
                pattern, e
            ))
        })?;
    }

    let prowl = &config.notifications.prowl;
    if prowl.enabled && prowl.api_key.as_deref().map_or(true, str::is_empty) {
        return Err(ConfigError::ValidationError(
            "notifications.prowl.api_key is required when prowl is enabled".to_string(),
        ));
    }

    Ok(())
}
