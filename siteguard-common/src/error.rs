//! Common error types for SiteGuard

use thiserror::Error;

/// Common result type for SiteGuard operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across SiteGuard crates
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    ///
    /// Raised once at construction time, before any site is processed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input (coordinates out of range, degenerate polygons)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Failed to parse a document (TOML, JSON)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
