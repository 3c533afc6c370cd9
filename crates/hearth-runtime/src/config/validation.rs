//! Configuration validation utilities.

use std::collections::HashSet;

use super::error::{ConfigError, ConfigResult};
use super::schema::{HearthConfig, LogOutput, LoggingConfig, PluginsConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &HearthConfig) -> ConfigResult<()> {
    validate_logging_config(&config.logging)?;
    validate_plugins_config(&config.plugins)?;
    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(config: &LoggingConfig) -> ConfigResult<()> {
    if config.filters.keys().any(|target| target.trim().is_empty()) {
        return Err(ConfigError::validation("Log filter target cannot be empty"));
    }

    if config.output == LogOutput::File && config.file_path.is_none() {
        return Err(ConfigError::validation(
            "logging.file_path is required when output is \"file\"",
        ));
    }

    if config.max_files == Some(0) {
        return Err(ConfigError::validation("logging.max_files must be greater than 0"));
    }

    Ok(())
}

/// Validates plugin discovery settings.
fn validate_plugins_config(config: &PluginsConfig) -> ConfigResult<()> {
    if config.extension.is_empty() {
        return Err(ConfigError::validation("plugins.extension cannot be empty"));
    }
    if config.extension.starts_with('.') {
        return Err(ConfigError::validation(format!(
            "plugins.extension must not start with a dot: {}",
            config.extension
        )));
    }

    if config.init_timeout_ms == Some(0) {
        return Err(ConfigError::validation(
            "plugins.init_timeout_ms must be greater than 0",
        ));
    }

    let mut seen = HashSet::new();
    for category in &config.categories {
        if category.trim().is_empty() {
            return Err(ConfigError::validation("Plugin category cannot be empty"));
        }
        if category.contains(['/', '\\']) || category == ".." {
            return Err(ConfigError::validation(format!(
                "Plugin category must be a single directory name: {category}"
            )));
        }
        if !seen.insert(category) {
            return Err(ConfigError::validation(format!(
                "Duplicate plugin category: {category}"
            )));
        }
    }

    Ok(())
}
