//! Per-settings-type configuration
//!
//! This module provides [`SettingsConfig`], the knobs a settings type sets to
//! tell the sources where to look: which secret to read, which AWS session to
//! use, and how the local sources (environment, dotenv, secret files) behave.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::{ParameterFetcher, SecretsFetcher};

/// Source configuration of a settings type
#[derive(Clone)]
pub struct SettingsConfig {
    // Secrets manager
    pub secrets_name: Option<String>,
    pub secrets_version: Option<String>,
    pub secrets_stage: Option<String>,
    /// Use this client instead of building one from the `aws_*` keys
    pub secrets_client: Option<Arc<dyn SecretsFetcher>>,

    // Parameter store
    /// Shared client for fields without their own client
    pub ssm_client: Option<Arc<dyn ParameterFetcher>>,
    /// Decrypt `SecureString` parameters
    pub ssm_with_decryption: bool,

    // AWS session
    pub aws_region: Option<String>,
    pub aws_profile: Option<String>,
    pub aws_access_key_id: Option<String>,
    pub aws_secret_access_key: Option<String>,
    pub aws_session_token: Option<String>,
    /// Custom endpoint, e.g. LocalStack
    pub aws_endpoint_url: Option<String>,

    // Local sources
    pub env_prefix: Option<String>,
    pub env_nested_delimiter: Option<String>,
    pub env_file: Option<PathBuf>,
    pub secrets_dir: Option<PathBuf>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            secrets_name: None,
            secrets_version: None,
            secrets_stage: None,
            secrets_client: None,
            ssm_client: None,
            ssm_with_decryption: true,
            aws_region: None,
            aws_profile: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_session_token: None,
            aws_endpoint_url: None,
            env_prefix: None,
            env_nested_delimiter: None,
            env_file: None,
            secrets_dir: None,
        }
    }
}

impl SettingsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secrets_name(mut self, name: impl Into<String>) -> Self {
        self.secrets_name = Some(name.into());
        self
    }

    pub fn with_secrets_version(mut self, version: impl Into<String>) -> Self {
        self.secrets_version = Some(version.into());
        self
    }

    pub fn with_secrets_stage(mut self, stage: impl Into<String>) -> Self {
        self.secrets_stage = Some(stage.into());
        self
    }

    pub fn with_secrets_client(mut self, client: Arc<dyn SecretsFetcher>) -> Self {
        self.secrets_client = Some(client);
        self
    }

    pub fn with_ssm_client(mut self, client: Arc<dyn ParameterFetcher>) -> Self {
        self.ssm_client = Some(client);
        self
    }

    pub fn with_ssm_decryption(mut self, enabled: bool) -> Self {
        self.ssm_with_decryption = enabled;
        self
    }

    pub fn with_aws_region(mut self, region: impl Into<String>) -> Self {
        self.aws_region = Some(region.into());
        self
    }

    pub fn with_aws_profile(mut self, profile: impl Into<String>) -> Self {
        self.aws_profile = Some(profile.into());
        self
    }

    /// Set a static access key pair, with an optional session token
    pub fn with_aws_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        self.aws_access_key_id = Some(access_key_id.into());
        self.aws_secret_access_key = Some(secret_access_key.into());
        self.aws_session_token = session_token;
        self
    }

    pub fn with_aws_endpoint_url(mut self, url: impl Into<String>) -> Self {
        self.aws_endpoint_url = Some(url.into());
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    pub fn with_env_nested_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.env_nested_delimiter = Some(delimiter.into());
        self
    }

    pub fn with_env_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.env_file = Some(path.into());
        self
    }

    pub fn with_secrets_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_dir = Some(path.into());
        self
    }
}

impl fmt::Debug for SettingsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsConfig")
            .field("secrets_name", &self.secrets_name)
            .field("secrets_version", &self.secrets_version)
            .field("secrets_stage", &self.secrets_stage)
            .field("secrets_client", &self.secrets_client.is_some())
            .field("ssm_client", &self.ssm_client.is_some())
            .field("ssm_with_decryption", &self.ssm_with_decryption)
            .field("aws_region", &self.aws_region)
            .field("aws_profile", &self.aws_profile)
            .field("aws_access_key_id", &self.aws_access_key_id)
            .field("aws_endpoint_url", &self.aws_endpoint_url)
            .field("env_prefix", &self.env_prefix)
            .field("env_nested_delimiter", &self.env_nested_delimiter)
            .field("env_file", &self.env_file)
            .field("secrets_dir", &self.secrets_dir)
            .finish_non_exhaustive()
    }
}
