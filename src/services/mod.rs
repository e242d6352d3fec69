//! Remote store services
//!
//! Client seams for Secrets Manager and SSM, and the resolvers that turn
//! their responses into settings values.

pub mod fetcher;
pub mod parameters;
pub mod secrets;

pub use fetcher::{CachedSecrets, ParameterFetcher, SecretPayload, SecretsFetcher};
pub use parameters::{get_parameter_value, ParameterResolver};
pub use secrets::{fetch_secret_document, get_secrets_content, SecretDocument};
