//! CLI runner for common setup.
//!
//! Loads the config file and initializes logging once per command.

use std::path::Path;

use tracing::info;

use cartogrid::config::{config_file_path, ConfigFile};
use cartogrid::logging::{default_log_dir, default_log_file, init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner, loading config and initializing logging.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Explicit config file; the default location otherwise
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging_guard = init_logging(&default_log_dir(), default_log_file())
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        info!(
            config = %config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(config_file_path)
                .display(),
            log = %logging_guard.log_path().display(),
            "Configuration loaded"
        );

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("cartogrid v{}", cartogrid::VERSION);
        info!("cartogrid CLI: {} command", command);
    }
}
