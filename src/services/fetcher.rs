//! Remote store clients
//!
//! [`SecretsFetcher`] and [`ParameterFetcher`] are the seams between the
//! resolvers and the AWS SDK. They are implemented for the SDK clients here;
//! any other type (a test double, a caching wrapper) can be plugged in through
//! [`SettingsConfig`](crate::config::SettingsConfig) or a field hint.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_secretsmanager::operation::get_secret_value::GetSecretValueError;
use aws_sdk_secretsmanager::Client as SecretsManagerClient;
use aws_sdk_ssm::operation::get_parameter::GetParameterError;
use aws_sdk_ssm::Client as SsmClient;
use aws_smithy_runtime_api::client::result::SdkError;
use moka::future::Cache;

use crate::error::FetchError;
use crate::schemas::SecretArgs;

/// Raw content of a secret version
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretPayload {
    pub secret_string: Option<String>,
    pub secret_binary: Option<Vec<u8>>,
}

impl SecretPayload {
    pub fn from_string(content: impl Into<String>) -> Self {
        Self {
            secret_string: Some(content.into()),
            secret_binary: None,
        }
    }

    pub fn from_binary(content: impl Into<Vec<u8>>) -> Self {
        Self {
            secret_string: None,
            secret_binary: Some(content.into()),
        }
    }
}

/// Reads a secret version from a secrets store
#[async_trait]
pub trait SecretsFetcher: Send + Sync {
    async fn fetch_secret(&self, args: &SecretArgs) -> Result<SecretPayload, FetchError>;
}

/// Reads a single parameter value from a parameter store
#[async_trait]
pub trait ParameterFetcher: Send + Sync {
    /// Returns `Ok(None)` when the parameter exists but carries no value
    async fn fetch_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<Option<String>, FetchError>;
}

#[async_trait]
impl SecretsFetcher for SecretsManagerClient {
    async fn fetch_secret(&self, args: &SecretArgs) -> Result<SecretPayload, FetchError> {
        let output = self
            .get_secret_value()
            .secret_id(&args.secret_id)
            .set_version_id(args.version_id.clone())
            .set_version_stage(args.version_stage.clone())
            .send()
            .await
            .map_err(fetch_error_from_get_secret_value)?;

        Ok(SecretPayload {
            secret_string: output.secret_string().map(str::to_string),
            secret_binary: output.secret_binary().map(|blob| blob.as_ref().to_vec()),
        })
    }
}

#[async_trait]
impl ParameterFetcher for SsmClient {
    async fn fetch_parameter(
        &self,
        name: &str,
        with_decryption: bool,
    ) -> Result<Option<String>, FetchError> {
        let output = self
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(fetch_error_from_get_parameter)?;

        Ok(output
            .parameter()
            .and_then(|parameter| parameter.value())
            .map(str::to_string))
    }
}

/// Remembers the secret versions a wrapped fetcher returned.
///
/// Failures are not cached. Lets a caller inspect a secret and then load
/// settings from it with a single remote read.
pub struct CachedSecrets {
    inner: Arc<dyn SecretsFetcher>,
    payloads: Cache<SecretArgs, SecretPayload>,
}

impl CachedSecrets {
    pub fn new(inner: Arc<dyn SecretsFetcher>) -> Self {
        Self {
            inner,
            payloads: Cache::builder().max_capacity(64).build(),
        }
    }
}

impl fmt::Debug for CachedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedSecrets")
            .field("cached", &self.payloads.entry_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl SecretsFetcher for CachedSecrets {
    async fn fetch_secret(&self, args: &SecretArgs) -> Result<SecretPayload, FetchError> {
        self.payloads
            .try_get_with(args.clone(), self.inner.fetch_secret(args))
            .await
            .map_err(|err| FetchError::clone(&err))
    }
}

fn fetch_error_from_get_secret_value<R>(err: SdkError<GetSecretValueError, R>) -> FetchError
where
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => match service_err.err() {
            GetSecretValueError::ResourceNotFoundException(e) => {
                FetchError::NotFound(e.message().unwrap_or("Secret not found").to_string())
            }
            error => FetchError::Service(error.to_string()),
        },
        _ => FetchError::Service(format!("{:?}", err)),
    }
}

fn fetch_error_from_get_parameter<R>(err: SdkError<GetParameterError, R>) -> FetchError
where
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => match service_err.err() {
            GetParameterError::ParameterNotFound(e) => {
                FetchError::NotFound(e.message().unwrap_or("Parameter not found").to_string())
            }
            error => FetchError::Service(error.to_string()),
        },
        _ => FetchError::Service(format!("{:?}", err)),
    }
}
