//! Path constants for configuration, cache and log files.

use std::path::PathBuf;

/// The name of the configuration directory under ~/.config/
pub const CONFIG_DIR_NAME: &str = "anthology";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the analysis cache database file
pub const ANALYSIS_CACHE_DB_FILE_NAME: &str = "analysis_cache.db";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "anthology.log";

/// The name of the optional user stylesheet
pub const THEME_FILE_NAME: &str = "theme.css";

/// Get the configuration directory path (~/.config/anthology/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(CONFIG_DIR_NAME)
}

/// Get the config file path (~/.config/anthology/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the analysis cache database path (`~/.config/anthology/analysis_cache.db`)
#[must_use]
pub fn analysis_cache_db_path() -> PathBuf {
    config_dir().join(ANALYSIS_CACHE_DB_FILE_NAME)
}

/// Get the log file path (`~/.config/anthology/anthology.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    config_dir().join(LOG_FILE_NAME)
}

/// Get the user theme path (`~/.config/anthology/theme.css`)
#[must_use]
pub fn theme_path() -> PathBuf {
    config_dir().join(THEME_FILE_NAME)
}
