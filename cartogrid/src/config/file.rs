//! Configuration file handling for `<config dir>/cartogrid/config.ini`.
//!
//! A missing file is not an error: every setting has a default.

use ini::Ini;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{default_start_location, FetchConfig, GridConfig};
use crate::coord::Location;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the INI file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// A key held a value that could not be used
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// Everything a session needs, as read from the config file.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfigFile {
    pub grid: GridConfig,
    pub fetch: FetchConfig,
    /// Initial viewport location.
    pub start: Location,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            fetch: FetchConfig::default(),
            start: default_start_location(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)
            .map_err(|e| ConfigError::ReadError(ini::Error::Parse(e)))?;
        super::parser::parse_ini(&ini)
    }
}

/// Get the path to the config directory (`<config dir>/cartogrid`).
pub fn config_directory() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cartogrid")
}

/// Get the path to the config file.
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.ini");
        std::fs::write(
            &path,
            "[grid]\nviewport_width = 1024\nviewport_height = 768\n\n[fetch]\nmax_concurrent = 2\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.grid.viewport.width, 1024);
        assert_eq!(config.grid.viewport.height, 768);
        assert_eq!(config.fetch.max_concurrent, 2);
        assert_eq!(config.grid.tile.width, 256);
    }

    #[test]
    fn test_config_file_path_ends_with_ini() {
        let path = config_file_path();
        assert!(path.ends_with("cartogrid/config.ini"));
    }
}
