//! Error types for Loci

use crate::id::SystemId;
use thiserror::Error;

/// The main error type for Loci operations
#[derive(Debug, Error)]
pub enum LociError {
    #[error("Particle system not found: {0}")]
    SystemNotFound(SystemId),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid enum value: {value} is not one of {allowed:?}")]
    InvalidEnumValue {
        value: String,
        allowed: Vec<String>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("TOML serialization error: {0}")]
    TomlSerError(String),

    #[error("Render error: {0}")]
    RenderError(String),
}

/// Result type alias for Loci operations
pub type Result<T> = std::result::Result<T, LociError>;

impl From<toml::de::Error> for LociError {
    fn from(err: toml::de::Error) -> Self {
        LociError::TomlParseError(err.to_string())
    }
}

impl From<toml::ser::Error> for LociError {
    fn from(err: toml::ser::Error) -> Self {
        LociError::TomlSerError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_errors_convert() {
        let err: LociError = toml::from_str::<toml::value::Table>("= broken")
            .unwrap_err()
            .into();
        assert!(matches!(err, LociError::TomlParseError(_)));
    }

    #[test]
    fn system_not_found_mentions_id() {
        let err = LociError::SystemNotFound(SystemId::from_raw(7));
        assert_eq!(err.to_string(), "Particle system not found: 7");
    }
}
