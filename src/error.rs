use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Calendar fetch error: {message}")]
    #[diagnostic(code(calfeed::fetch))]
    Fetch { message: String, transient: bool },

    #[error("Calendar parse error: {0}")]
    #[diagnostic(code(calfeed::parse))]
    Parse(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(calfeed::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(calfeed::config))]
    Config(String),

    #[error("Post store error: {0}")]
    #[diagnostic(code(calfeed::posts))]
    Posts(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(calfeed::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(calfeed::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(calfeed::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(calfeed::other))]
    Other(String),
}

impl Error {
    /// True for upstream failures worth one more attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Fetch { transient: true, .. })
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for JSON errors
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Posts(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type AppResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create fetch errors
pub fn fetch_error(message: &str) -> Error {
    Error::Fetch {
        message: message.to_string(),
        transient: false,
    }
}

/// Helper to create fetch errors that are eligible for a retry
pub fn transient_fetch_error(message: &str) -> Error {
    Error::Fetch {
        message: message.to_string(),
        transient: true,
    }
}

/// Helper to create parse errors
pub fn parse_error(message: &str) -> Error {
    Error::Parse(message.to_string())
}

/// Helper to create post store errors
pub fn posts_error(message: &str) -> Error {
    Error::Posts(message.to_string())
}

/// Helper to create other errors
pub fn other_error(message: &str) -> Error {
    Error::Other(message.to_string())
}
