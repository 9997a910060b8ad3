use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub default_container: String,
    pub allow_cellular_uploads: bool,
    pub confirm_cellular_uploads: bool,
    pub max_file_size_mb: u64,
    pub rate_limit_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub max_retry_attempts: u32,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_container: "Uploads".to_string(),
            allow_cellular_uploads: false,
            confirm_cellular_uploads: true,
            max_file_size_mb: 50,
            rate_limit_delay_ms: 500,
            request_timeout_secs: 120,
            max_retry_attempts: 3,
            log_level: "info".to_string(),
        }
    }
}

fn get_config_path() -> AppResult<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AppError::Config("Could not find config directory".to_string()))?
        .join("Gallery Uploader");

    fs::create_dir_all(&config_dir)?;
    Ok(config_dir.join("config.json"))
}

pub fn load_config() -> AppResult<Config> {
    let config_path = get_config_path()?;

    if config_path.exists() {
        let config_str = fs::read_to_string(&config_path)?;
        let config: Config = serde_json::from_str(&config_str).unwrap_or_else(|e| {
            log::warn!("Failed to parse config file: {}. Using defaults.", e);
            Config::default()
        });

        // Validate config before returning
        validate_config(&config)?;

        Ok(config)
    } else {
        // Create default config
        let default_config = Config::default();
        save_config_internal(&default_config)?;
        Ok(default_config)
    }
}

pub fn save_config(config: Config) -> AppResult<()> {
    validate_config(&config)?;
    save_config_internal(&config)
}

fn save_config_internal(config: &Config) -> AppResult<()> {
    let config_path = get_config_path()?;

    // Create backup of existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.bak");
        if let Err(e) = fs::copy(&config_path, &backup_path) {
            log::warn!("Failed to create config backup: {}", e);
        }
    }

    let config_str = serde_json::to_string_pretty(config)?;
    fs::write(&config_path, config_str)?;

    log::info!("Configuration saved successfully");
    Ok(())
}

pub fn validate_config(config: &Config) -> AppResult<()> {
    if config.default_container.trim().is_empty() {
        return Err(AppError::validation("default_container", "Must not be empty"));
    }

    if config.max_file_size_mb == 0 || config.max_file_size_mb > 500 {
        return Err(AppError::validation("max_file_size_mb", "Must be between 1 and 500"));
    }

    if config.rate_limit_delay_ms < 100 {
        return Err(AppError::validation("rate_limit_delay_ms", "Must be at least 100ms"));
    }

    if config.request_timeout_secs == 0 {
        return Err(AppError::validation("request_timeout_secs", "Must be greater than 0"));
    }

    if config.max_retry_attempts > 10 {
        return Err(AppError::validation("max_retry_attempts", "Must be 10 or fewer"));
    }

    // Validate log level
    let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
    if !valid_log_levels.contains(&config.log_level.as_str()) {
        return Err(AppError::validation("log_level", "Must be a valid log level"));
    }

    Ok(())
}

// Reset configuration to defaults
pub fn reset_config() -> AppResult<()> {
    let config_path = get_config_path()?;

    // Backup existing config
    if config_path.exists() {
        let backup_path = config_path.with_extension("json.reset_backup");
        fs::copy(&config_path, &backup_path)?;
        log::info!("Existing config backed up to {}", backup_path.display());
    }

    let default_config = Config::default();
    save_config_internal(&default_config)?;

    log::info!("Configuration reset to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn rejects_zero_file_size_limit() {
        let config = Config {
            max_file_size_mb: 0,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let config = Config {
            log_level: "verbose".to_string(),
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn rejects_too_small_rate_limit_delay() {
        let config = Config {
            rate_limit_delay_ms: 10,
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }
}
