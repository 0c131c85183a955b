//! Error types for schema_drift

use thiserror::Error;

use crate::source::SchemaSide;

/// Result type for schema_drift operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for schema_drift
///
/// Detected drift is never an error; it is reported through
/// [`DriftReport`](crate::schema::report::DriftReport).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{side} schema source unavailable: {message}")]
    CollaboratorUnavailable { side: SchemaSide, message: String },

    #[error("Malformed schema: {0}")]
    MalformedSchema(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),
}

impl Error {
    /// Wrap a failure of one schema source, keeping malformed-schema errors as they are
    pub fn from_source(side: SchemaSide, error: Error) -> Self {
        match error {
            Error::MalformedSchema(message) => {
                Error::MalformedSchema(format!("{} schema: {}", side, message))
            }
            already @ Error::CollaboratorUnavailable { .. } => already,
            other => Error::CollaboratorUnavailable {
                side,
                message: other.to_string(),
            },
        }
    }
}

/// Convert Serde JSON errors to schema_drift errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to schema_drift errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(error: toml::ser::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}
