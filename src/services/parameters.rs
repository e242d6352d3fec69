//! SSM Parameter Store resolver
//!
//! One remote call per annotated field. The parameter name and client can be
//! overridden per field; otherwise the field name is the parameter name and
//! all fields share one client.

use std::fmt;
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{ClientFactory, SettingsConfig};
use crate::error::{FetchError, Result, SettingsError};
use crate::schemas::ParameterHint;
use crate::services::ParameterFetcher;

/// Resolves parameter hints for one settings config
pub struct ParameterResolver {
    config: SettingsConfig,
    factory: ClientFactory,
    shared: OnceCell<Arc<dyn ParameterFetcher>>,
}

impl ParameterResolver {
    pub fn new(config: SettingsConfig, factory: ClientFactory) -> Self {
        Self {
            config,
            factory,
            shared: OnceCell::new(),
        }
    }

    /// Client used by fields that don't bring their own
    async fn shared_client(&self) -> &Arc<dyn ParameterFetcher> {
        self.shared
            .get_or_init(|| self.factory.parameter_fetcher(&self.config))
            .await
    }

    /// Resolve the value of `field_name` as described by `hint`.
    ///
    /// A missing or value-less parameter is `Ok(None)`, leaving the field to
    /// the next settings source.
    pub async fn resolve(&self, field_name: &str, hint: &ParameterHint) -> Result<Option<String>> {
        let name = hint.name.as_deref().unwrap_or(field_name);

        let client = match &hint.client {
            Some(client) => client,
            None => self.shared_client().await,
        };

        tracing::debug!(
            field = %field_name,
            parameter = %name,
            dedicated_client = hint.client.is_some(),
            "Fetching parameter"
        );

        match client.fetch_parameter(name, self.config.ssm_with_decryption).await {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                tracing::debug!(field = %field_name, parameter = %name, "Parameter has no value");
                Ok(None)
            }
            Err(FetchError::NotFound(message)) => {
                tracing::warn!(
                    field = %field_name,
                    parameter = %name,
                    error = %message,
                    "Parameter not found, falling through to the next source"
                );
                Ok(None)
            }
            Err(FetchError::Service(message)) => {
                tracing::error!(parameter = %name, error = %message, "Failed to fetch parameter");
                Err(SettingsError::Remote {
                    service: "SSM",
                    message,
                })
            }
        }
    }
}

impl fmt::Debug for ParameterResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterResolver")
            .field("config", &self.config)
            .field("shared_client", &self.shared.initialized())
            .finish()
    }
}

/// Resolve a single parameter-store field (convenience function)
pub async fn get_parameter_value(
    field_name: &str,
    hint: &ParameterHint,
    config: &SettingsConfig,
    factory: &ClientFactory,
) -> Result<Option<String>> {
    ParameterResolver::new(config.clone(), factory.clone())
        .resolve(field_name, hint)
        .await
}
