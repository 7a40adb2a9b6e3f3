//! Common error types for WNC

use thiserror::Error;

/// Common result type for WNC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WNC crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error for persisted tables and caches
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_and_not_found_messages() {
        let io: Error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(io, Error::Io(_)));
        assert_eq!(Error::NotFound("genre_cache.json".into()).to_string(), "Not found: genre_cache.json");
    }

    #[test]
    fn test_json_errors_convert() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.to_string().starts_with("JSON error"));
    }
}
