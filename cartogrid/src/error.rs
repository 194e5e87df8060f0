//! Error types for the tile grid and tile fetching.

use thiserror::Error;

/// Errors returned by the [`TileGrid`](crate::grid::TileGrid) API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    /// A size parameter (tile or viewport edge) was zero.
    #[error("Invalid dimension: {name} = {value} (must be positive)")]
    InvalidDimension { name: &'static str, value: u32 },

    /// The grid has been closed.
    #[error("Tile grid is closed")]
    Closed,
}

/// Errors from fetching a single tile.
///
/// These never escape the fetch worker: they are logged and the tile is
/// abandoned (or, for [`FetchError::NotFound`], replaced by a placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Tile not found (HTTP 404)")]
    NotFound,

    #[error("Access forbidden (HTTP 403)")]
    Forbidden,

    #[error("Tile gone (HTTP 410)")]
    Gone,

    #[error("Request URI too long (HTTP 414)")]
    UriTooLong,

    #[error("Unexpected HTTP status {0}")]
    UnexpectedStatus(u16),

    /// The load was cancelled before it completed.
    #[error("Fetch cancelled")]
    Cancelled,

    /// Connection, timeout or body read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body was not a decodable image.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl FetchError {
    /// Maps a non-success HTTP status code to its fetch error.
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => FetchError::NotFound,
            403 => FetchError::Forbidden,
            410 => FetchError::Gone,
            414 => FetchError::UriTooLong,
            other => FetchError::UnexpectedStatus(other),
        }
    }

    /// Returns true for a missing tile, which renders as a placeholder.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound)
    }

    /// Returns true if the fetch was abandoned due to cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(FetchError::from_status(404), FetchError::NotFound);
        assert_eq!(FetchError::from_status(403), FetchError::Forbidden);
        assert_eq!(FetchError::from_status(410), FetchError::Gone);
        assert_eq!(FetchError::from_status(414), FetchError::UriTooLong);
        assert_eq!(
            FetchError::from_status(503),
            FetchError::UnexpectedStatus(503)
        );
    }

    #[test]
    fn test_is_not_found() {
        assert!(FetchError::NotFound.is_not_found());
        assert!(!FetchError::Gone.is_not_found());
        assert!(FetchError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_display() {
        let err = GridError::InvalidDimension {
            name: "tile_width",
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "Invalid dimension: tile_width = 0 (must be positive)"
        );
        assert_eq!(
            FetchError::UnexpectedStatus(500).to_string(),
            "Unexpected HTTP status 500"
        );
    }
}
