//! Error types for `GameSpot` core library.

use thiserror::Error;

/// Result type alias using `GameSpot` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `GameSpot` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse error
    #[error("Failed to parse site config: {0}")]
    Toml(#[from] toml::de::Error),
}
