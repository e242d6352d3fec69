//! AWS SDK configuration and client factory
//!
//! This module builds Secrets Manager and SSM clients from an [`AwsSession`],
//! supporting custom endpoints for local development and testing, and caches
//! them so settings types with identical credentials share one client.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use aws_config::{meta::region::RegionProviderChain, BehaviorVersion, Region, SdkConfig};
use aws_sdk_secretsmanager::config::Credentials;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_ssm::Client as SsmClient;
use moka::future::Cache;

use crate::config::SettingsConfig;
use crate::schemas::AwsSession;
use crate::services::{ParameterFetcher, SecretsFetcher};

/// Service name used in cache keys for Secrets Manager clients
pub const SECRETS_MANAGER_SERVICE: &str = "secretsmanager";

/// Service name used in cache keys for SSM clients
pub const SSM_SERVICE: &str = "ssm";

const CREDENTIALS_PROVIDER_NAME: &str = "aws-settings-static";

/// AWS configuration builder
///
/// Creates AWS SDK configuration with support for:
/// - Custom regions, falling back to the default region chain
/// - Named profiles
/// - Static credentials, falling back to the default credential chain
/// - Custom endpoint URLs for local testing
pub struct AwsConfigBuilder<'a> {
    session: &'a AwsSession,
}

impl<'a> AwsConfigBuilder<'a> {
    pub fn new(session: &'a AwsSession) -> Self {
        Self { session }
    }

    /// Build the base AWS SDK configuration
    pub async fn build_sdk_config(&self) -> SdkConfig {
        let region_provider =
            RegionProviderChain::first_try(self.session.region.clone().map(Region::new))
                .or_default_provider();

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region_provider);

        if let Some(profile) = &self.session.profile {
            loader = loader.profile_name(profile);
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&self.session.access_key_id, &self.session.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id.clone(),
                secret_access_key.clone(),
                self.session.session_token.clone(),
                None,
                CREDENTIALS_PROVIDER_NAME,
            ));
        }

        if let Some(endpoint_url) = &self.session.endpoint_url {
            tracing::info!(endpoint = %endpoint_url, "Using custom AWS endpoint");
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
    }

    pub async fn build_secrets_client(&self) -> SecretsManagerClient {
        SecretsManagerClient::new(&self.build_sdk_config().await)
    }

    pub async fn build_ssm_client(&self) -> SsmClient {
        SsmClient::new(&self.build_sdk_config().await)
    }
}

/// Builds and caches SDK clients keyed by service and session fingerprint.
///
/// Cloning is cheap; clones share the same caches.
#[derive(Clone)]
pub struct ClientFactory {
    secrets: Cache<String, SecretsManagerClient>,
    ssm: Cache<String, SsmClient>,
}

impl Default for ClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientFactory {
    pub fn new() -> Self {
        Self {
            secrets: client_cache(),
            ssm: client_cache(),
        }
    }

    /// Process-wide factory shared by every loader that does not bring its own
    pub fn global() -> &'static ClientFactory {
        static GLOBAL: OnceLock<ClientFactory> = OnceLock::new();
        GLOBAL.get_or_init(ClientFactory::new)
    }

    pub fn cache_key(service: &str, session: &AwsSession) -> String {
        format!("{}:{}", service, session.session_key())
    }

    /// Get or build the Secrets Manager client for `session`
    pub async fn secrets_client(&self, session: &AwsSession) -> SecretsManagerClient {
        let key = Self::cache_key(SECRETS_MANAGER_SERVICE, session);
        self.secrets
            .get_with(key.clone(), async move {
                tracing::debug!(cache_key = %key, "Creating Secrets Manager client");
                AwsConfigBuilder::new(session).build_secrets_client().await
            })
            .await
    }

    /// Get or build the SSM client for `session`
    pub async fn ssm_client(&self, session: &AwsSession) -> SsmClient {
        let key = Self::cache_key(SSM_SERVICE, session);
        self.ssm
            .get_with(key.clone(), async move {
                tracing::debug!(cache_key = %key, "Creating SSM client");
                AwsConfigBuilder::new(session).build_ssm_client().await
            })
            .await
    }

    /// Whether a client for `service` and `session` is already cached
    pub fn is_cached(&self, service: &str, session: &AwsSession) -> bool {
        let key = Self::cache_key(service, session);
        match service {
            SECRETS_MANAGER_SERVICE => self.secrets.contains_key(&key),
            SSM_SERVICE => self.ssm.contains_key(&key),
            _ => false,
        }
    }

    /// The secrets client for a settings config: the caller-supplied one when
    /// present, otherwise a cached SDK client
    pub async fn secrets_fetcher(&self, config: &SettingsConfig) -> Arc<dyn SecretsFetcher> {
        if let Some(client) = &config.secrets_client {
            return Arc::clone(client);
        }

        tracing::debug!("No secrets client was supplied, using the client factory");
        let session = AwsSession::from_config(config);
        Arc::new(self.secrets_client(&session).await)
    }

    /// The shared parameter store client for a settings config
    pub async fn parameter_fetcher(&self, config: &SettingsConfig) -> Arc<dyn ParameterFetcher> {
        if let Some(client) = &config.ssm_client {
            return Arc::clone(client);
        }

        tracing::debug!("No SSM client was supplied, using the client factory");
        let session = AwsSession::from_config(config);
        Arc::new(self.ssm_client(&session).await)
    }
}

// Credentials rotate, so idle clients are dropped after an hour
fn client_cache<V>() -> Cache<String, V>
where
    V: Clone + Send + Sync + 'static,
{
    Cache::builder()
        .max_capacity(64)
        .time_to_idle(Duration::from_secs(3600))
        .build()
}

impl fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientFactory")
            .field("secrets_clients", &self.secrets.entry_count())
            .field("ssm_clients", &self.ssm.entry_count())
            .finish()
    }
}

/// Build AWS SDK config for a session (convenience function)
pub async fn build_aws_config(session: &AwsSession) -> SdkConfig {
    AwsConfigBuilder::new(session).build_sdk_config().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_session() -> AwsSession {
        AwsSession {
            region: Some("us-east-1".to_string()),
            access_key_id: Some("AKIAEXAMPLE".to_string()),
            secret_access_key: Some("secret".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_build_sdk_config() {
        let config = build_aws_config(&static_session()).await;

        assert_eq!(config.region().unwrap().as_ref(), "us-east-1");
        assert!(config.credentials_provider().is_some());
    }

    #[tokio::test]
    async fn test_custom_endpoint() {
        let session = AwsSession {
            endpoint_url: Some("http://localhost:4566".to_string()),
            ..static_session()
        };

        let config = build_aws_config(&session).await;
        assert_eq!(config.endpoint_url(), Some("http://localhost:4566"));
    }

    #[tokio::test]
    async fn test_clients_are_cached_by_session() {
        let factory = ClientFactory::new();
        let session = static_session();

        assert!(!factory.is_cached(SECRETS_MANAGER_SERVICE, &session));

        let _first = factory.secrets_client(&session).await;
        let _second = factory.secrets_client(&session.clone()).await;
        factory.secrets.run_pending_tasks().await;

        assert!(factory.is_cached(SECRETS_MANAGER_SERVICE, &session));
        assert_eq!(factory.secrets.entry_count(), 1);
        assert!(!factory.is_cached(SSM_SERVICE, &session));
    }

    #[tokio::test]
    async fn test_different_credentials_get_different_clients() {
        let factory = ClientFactory::new();
        let other = AwsSession {
            region: Some("eu-west-1".to_string()),
            ..static_session()
        };

        let _a = factory.ssm_client(&static_session()).await;
        let _b = factory.ssm_client(&other).await;
        factory.ssm.run_pending_tasks().await;

        assert_eq!(factory.ssm.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_secrets_and_ssm_clients_cached_separately() {
        let factory = ClientFactory::new();
        let session = static_session();

        let _secrets = factory.secrets_client(&session).await;
        let _ssm = factory.ssm_client(&session).await;
        factory.secrets.run_pending_tasks().await;
        factory.ssm.run_pending_tasks().await;

        assert!(factory.is_cached(SECRETS_MANAGER_SERVICE, &session));
        assert!(factory.is_cached(SSM_SERVICE, &session));
        assert_eq!(factory.secrets.entry_count(), 1);
        assert_eq!(factory.ssm.entry_count(), 1);
    }

    #[test]
    fn test_cache_key_includes_service() {
        let session = AwsSession::default();
        assert_eq!(
            ClientFactory::cache_key(SECRETS_MANAGER_SERVICE, &session),
            "secretsmanager:default"
        );
        assert_eq!(ClientFactory::cache_key(SSM_SERVICE, &session), "ssm:default");
    }
}
