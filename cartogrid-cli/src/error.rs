//! CLI error handling with user-friendly messages.

use std::fmt;
use std::process;

use cartogrid::config::ConfigError;
use cartogrid::{FetchError, GridError};

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration file could not be read or parsed
    Config(ConfigError),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Grid creation or operation failed
    Grid(GridError),
    /// HTTP client could not be built
    Client(FetchError),
    /// Async runtime or task failure
    Runtime(String),
    /// Failed to write output file
    FileWrite {
        path: String,
        error: image::ImageError,
    },
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Config(_) = self {
            eprintln!();
            eprintln!(
                "Check the file at {} or pass --config.",
                cartogrid::config::config_file_path().display()
            );
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            CliError::Grid(e) => write!(f, "Tile grid error: {}", e),
            CliError::Client(e) => write!(f, "Failed to create HTTP client: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Grid(e) => Some(e),
            CliError::Client(e) => Some(e),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<GridError> for CliError {
    fn from(e: GridError) -> Self {
        CliError::Grid(e)
    }
}
