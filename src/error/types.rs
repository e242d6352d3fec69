//! Settings error types

use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

use config::ConfigError;
use thiserror::Error;

/// Result alias used across the crate
pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

/// Normalized failure of a single remote call.
///
/// Fetchers translate their vendor errors into this so that resolvers can
/// tell "the key does not exist" apart from every other remote failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Service error: {0}")]
    Service(String),
}

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Secret name is required: set `secrets_name` in the settings config")]
    MissingSecretName,

    #[error("Invalid secret request: {0}")]
    InvalidSecretArgs(#[from] validator::ValidationErrors),

    #[error("Secret {name} does not exist: {message}")]
    SecretNotFound { name: String, message: String },

    #[error("Secret {name} has no content")]
    EmptySecret { name: String },

    #[error("Secret {name} binary content is not valid UTF-8: {source}")]
    InvalidSecretEncoding {
        name: String,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Secret {name} content must be valid JSON: {source}")]
    InvalidSecretJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Secret {name} content must be a JSON object")]
    SecretNotAnObject { name: String },

    #[error("Field name {name} must be lowercase, settings keys are matched case-insensitively")]
    InvalidFieldName { name: String },

    #[error("{service} error: {message}")]
    Remote {
        service: &'static str,
        message: String,
    },

    #[error("Secrets directory {} is not readable: {source}", path.display())]
    SecretsDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Dotenv file {} could not be parsed: {source}", path.display())]
    Dotenv {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },

    #[error("Configuration error: {0}")]
    Config(ConfigError),
}

impl SettingsError {
    /// Whether the error came from the secret having no usable content
    pub fn is_empty_secret(&self) -> bool {
        matches!(self, SettingsError::EmptySecret { .. })
    }

    /// Whether the error came from content that failed to decode
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            SettingsError::InvalidSecretJson { .. }
                | SettingsError::InvalidSecretEncoding { .. }
                | SettingsError::SecretNotAnObject { .. }
        )
    }
}

/// Sources report failures to the `config` crate as foreign errors; unwrap
/// them back so callers can match on the original variant.
impl From<ConfigError> for SettingsError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Foreign(inner) => match inner.downcast::<SettingsError>() {
                Ok(settings_err) => *settings_err,
                Err(other) => SettingsError::Config(ConfigError::Foreign(other)),
            },
            other => SettingsError::Config(other),
        }
    }
}

impl From<SettingsError> for ConfigError {
    fn from(err: SettingsError) -> Self {
        ConfigError::Foreign(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_round_trip_keeps_variant() {
        let config_err: ConfigError = SettingsError::EmptySecret {
            name: "my/secret".to_string(),
        }
        .into();

        let err = SettingsError::from(config_err);
        assert!(err.is_empty_secret());
    }

    #[test]
    fn test_plain_config_error_is_wrapped() {
        let err = SettingsError::from(ConfigError::Message("boom".to_string()));
        assert!(matches!(err, SettingsError::Config(ConfigError::Message(_))));
    }

    #[test]
    fn test_decode_error_classification() {
        let source = serde_json::from_str::<serde_json::Value>("{ not json").unwrap_err();
        let err = SettingsError::InvalidSecretJson {
            name: "my/secret".to_string(),
            source,
        };
        assert!(err.is_decode_error());
        assert!(!err.is_empty_secret());
    }
}
