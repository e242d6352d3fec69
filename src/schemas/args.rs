//! Request argument models
//!
//! Typed views over the `secrets_*` and `aws_*` keys of a [`SettingsConfig`].

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use validator::Validate;

use crate::config::SettingsConfig;
use crate::error::{Result, SettingsError};

/// Arguments for a single secret lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Validate)]
pub struct SecretArgs {
    /// Secret name or ARN
    #[validate(length(min = 1, message = "secret id cannot be empty"))]
    pub secret_id: String,

    /// Pin a specific version
    pub version_id: Option<String>,

    /// Pin a staging label (e.g. `AWSCURRENT`)
    pub version_stage: Option<String>,
}

impl SecretArgs {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            version_id: None,
            version_stage: None,
        }
    }

    pub fn with_version_id(mut self, version_id: impl Into<String>) -> Self {
        self.version_id = Some(version_id.into());
        self
    }

    pub fn with_version_stage(mut self, version_stage: impl Into<String>) -> Self {
        self.version_stage = Some(version_stage.into());
        self
    }

    /// Extract and validate the secret arguments of a settings config
    pub fn from_config(config: &SettingsConfig) -> Result<Self> {
        let secret_id = config
            .secrets_name
            .clone()
            .ok_or(SettingsError::MissingSecretName)?;

        let args = Self {
            secret_id,
            version_id: config.secrets_version.clone(),
            version_stage: config.secrets_stage.clone(),
        };
        args.validate()?;

        Ok(args)
    }
}

/// AWS session parameters used to build SDK clients
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AwsSession {
    pub region: Option<String>,
    pub profile: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
    pub endpoint_url: Option<String>,
}

impl AwsSession {
    pub fn from_config(config: &SettingsConfig) -> Self {
        Self {
            region: config.aws_region.clone(),
            profile: config.aws_profile.clone(),
            access_key_id: config.aws_access_key_id.clone(),
            secret_access_key: config.aws_secret_access_key.clone(),
            session_token: config.aws_session_token.clone(),
            endpoint_url: config.aws_endpoint_url.clone(),
        }
    }

    /// Whether an explicit access key pair was configured
    pub fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }

    /// Fingerprint of the session, used as the client cache key.
    ///
    /// Returns `"default"` when nothing is set, so every settings type relying
    /// on the ambient AWS environment shares one client. Secret material only
    /// contributes through a hash.
    pub fn session_key(&self) -> String {
        let mut parts = Vec::new();

        let plain = [
            ("region", &self.region),
            ("profile", &self.profile),
            ("access_key_id", &self.access_key_id),
            ("endpoint_url", &self.endpoint_url),
        ];
        for (label, value) in plain {
            if let Some(value) = value {
                parts.push(format!("{}={}", label, value));
            }
        }

        if self.secret_access_key.is_some() || self.session_token.is_some() {
            let mut hasher = DefaultHasher::new();
            self.secret_access_key.hash(&mut hasher);
            self.session_token.hash(&mut hasher);
            parts.push(format!("secret={:016x}", hasher.finish()));
        }

        if parts.is_empty() {
            "default".to_string()
        } else {
            parts.join(";")
        }
    }
}

impl fmt::Debug for AwsSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSession")
            .field("region", &self.region)
            .field("profile", &self.profile)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_default_when_empty() {
        let session = AwsSession::default();
        assert_eq!(session.session_key(), "default");
    }

    #[test]
    fn test_session_key_does_not_leak_secrets() {
        let session = AwsSession {
            region: Some("eu-west-1".to_string()),
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("super-secret".to_string()),
            ..Default::default()
        };

        let key = session.session_key();
        assert!(key.contains("region=eu-west-1"));
        assert!(key.contains("access_key_id=AKIAEXAMPLE"));
        assert!(!key.contains("super-secret"));
    }

    #[test]
    fn test_session_key_differs_by_secret() {
        let first = AwsSession {
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("one".to_string()),
            ..Default::default()
        };
        let second = AwsSession {
            secret_access_key: Some("two".to_string()),
            ..first.clone()
        };

        assert_ne!(first.session_key(), second.session_key());
        assert_eq!(first.session_key(), first.clone().session_key());
    }

    #[test]
    fn test_secret_args_from_config() {
        let config = SettingsConfig::default()
            .with_secrets_name("my/secret")
            .with_secrets_stage("AWSCURRENT");

        let args = SecretArgs::from_config(&config).unwrap();
        assert_eq!(args.secret_id, "my/secret");
        assert_eq!(args.version_id, None);
        assert_eq!(args.version_stage.as_deref(), Some("AWSCURRENT"));
    }

    #[test]
    fn test_secret_args_require_name() {
        let err = SecretArgs::from_config(&SettingsConfig::default()).unwrap_err();
        assert!(matches!(err, SettingsError::MissingSecretName));

        let config = SettingsConfig::default().with_secrets_name("");
        let err = SecretArgs::from_config(&config).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidSecretArgs(_)));
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let session = AwsSession {
            secret_access_key: Some("super-secret".to_string()),
            session_token: Some("token".to_string()),
            ..Default::default()
        };
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("\"token\""));
    }
}
