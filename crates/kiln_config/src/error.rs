//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `kiln.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A scope key is not a rooted virtual path prefix.
    #[error("invalid scope '{0}': scope keys must be rooted virtual paths")]
    InvalidScope(String),

    /// An extension mapping key is malformed.
    #[error("invalid extension '{0}': extensions are configured without a leading dot or slash")]
    InvalidExtension(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_scope() {
        let err = ConfigError::InvalidScope("admin".to_string());
        assert_eq!(
            format!("{err}"),
            "invalid scope 'admin': scope keys must be rooted virtual paths"
        );
    }

    #[test]
    fn display_parse_error() {
        let err = ConfigError::ParseError("expected '=' at line 3".to_string());
        assert_eq!(
            format!("{err}"),
            "failed to parse configuration: expected '=' at line 3"
        );
    }

    #[test]
    fn display_validation_error() {
        let err = ConfigError::ValidationError("max_batch_size must be at least 1".to_string());
        assert_eq!(
            format!("{err}"),
            "validation error: max_batch_size must be at least 1"
        );
    }
}
