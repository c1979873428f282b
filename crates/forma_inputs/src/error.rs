//! Error types for forma_inputs

use thiserror::Error;

/// Errors that can occur while configuring or driving input components
#[derive(Error, Debug)]
pub enum FormaError {
    /// A validation pattern failed to compile
    #[error("Invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// Deriving file properties (source, blob, url, hash) failed
    #[error("File derivation failed: {0}")]
    Derivation(String),

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    Config(String),

    /// An event name that maps to no callback
    #[error("Unknown event kind: {0}")]
    UnknownEvent(String),

    /// Failed to read a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("TOML parsing failed: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for forma_inputs operations
pub type Result<T> = std::result::Result<T, FormaError>;
