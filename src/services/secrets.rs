//! Secrets Manager resolver
//!
//! Fetches one secret version and decodes it as a JSON object, exposing it as
//! a flat `field -> value` document.

use serde_json::{Map, Value as JsonValue};

use crate::config::{ClientFactory, SettingsConfig};
use crate::error::{FetchError, Result, SettingsError};
use crate::schemas::SecretArgs;
use crate::services::{SecretPayload, SecretsFetcher};

/// Decoded secret document
pub type SecretDocument = Map<String, JsonValue>;

/// Fetch the secret named by `config` and decode its JSON content.
///
/// Uses `config.secrets_client` when set, otherwise a client from `factory`.
pub async fn get_secrets_content(
    config: &SettingsConfig,
    factory: &ClientFactory,
) -> Result<SecretDocument> {
    let args = SecretArgs::from_config(config).map_err(|err| {
        tracing::error!(error = %err, "Secret request is invalid, check the secrets_* settings");
        err
    })?;

    let client = factory.secrets_fetcher(config).await;
    fetch_secret_document(client.as_ref(), &args).await
}

/// Fetch and decode a secret with an already-resolved client
pub async fn fetch_secret_document(
    client: &dyn SecretsFetcher,
    args: &SecretArgs,
) -> Result<SecretDocument> {
    tracing::debug!(secret = %args.secret_id, "Fetching secret");

    let payload = client.fetch_secret(args).await.map_err(|err| match err {
        FetchError::NotFound(message) => {
            tracing::error!(secret = %args.secret_id, error = %message, "Secret does not exist");
            SettingsError::SecretNotFound {
                name: args.secret_id.clone(),
                message,
            }
        }
        FetchError::Service(message) => {
            tracing::error!(secret = %args.secret_id, error = %message, "Failed to fetch secret");
            SettingsError::Remote {
                service: "Secrets Manager",
                message,
            }
        }
    })?;

    let content = secret_content(&args.secret_id, payload)?;
    decode_document(&args.secret_id, &content)
}

/// Pick the secret text: the string field when non-empty, else the binary field
fn secret_content(name: &str, payload: SecretPayload) -> Result<String> {
    match payload {
        SecretPayload {
            secret_string: Some(content),
            ..
        } if !content.is_empty() => Ok(content),
        SecretPayload {
            secret_binary: Some(bytes),
            ..
        } if !bytes.is_empty() => String::from_utf8(bytes).map_err(|source| {
            tracing::error!(secret = %name, error = %source, "Secret binary is not valid UTF-8");
            SettingsError::InvalidSecretEncoding {
                name: name.to_string(),
                source,
            }
        }),
        _ => {
            tracing::error!(secret = %name, "Secret has no content");
            Err(SettingsError::EmptySecret {
                name: name.to_string(),
            })
        }
    }
}

fn decode_document(name: &str, content: &str) -> Result<SecretDocument> {
    match serde_json::from_str::<JsonValue>(content) {
        Ok(JsonValue::Object(document)) => Ok(document),
        Ok(_) => {
            tracing::error!(secret = %name, "Secret content must be a JSON object");
            Err(SettingsError::SecretNotAnObject {
                name: name.to_string(),
            })
        }
        Err(source) => {
            tracing::error!(secret = %name, error = %source, "Secret content must be valid JSON");
            Err(SettingsError::InvalidSecretJson {
                name: name.to_string(),
                source,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StaticSecrets;
    use std::sync::Arc;

    const CREDENTIALS: &str = r#"{ "username": "myusername", "password": "password1234" }"#;

    fn config_with(client: StaticSecrets) -> SettingsConfig {
        SettingsConfig::default()
            .with_secrets_name("my/secret")
            .with_secrets_client(Arc::new(client))
    }

    #[tokio::test]
    async fn test_string_content_is_decoded() {
        let config = config_with(StaticSecrets::new().with_json("my/secret", CREDENTIALS));

        let document = get_secrets_content(&config, &ClientFactory::new()).await.unwrap();
        assert_eq!(document["username"], "myusername");
        assert_eq!(document["password"], "password1234");
    }

    #[tokio::test]
    async fn test_string_preferred_over_binary() {
        let payload = SecretPayload {
            secret_string: Some(r#"{"source": "string"}"#.to_string()),
            secret_binary: Some(br#"{"source": "binary"}"#.to_vec()),
        };
        let config = config_with(StaticSecrets::new().with_payload("my/secret", payload));

        let document = get_secrets_content(&config, &ClientFactory::new()).await.unwrap();
        assert_eq!(document["source"], "string");
    }

    #[tokio::test]
    async fn test_binary_fallback_when_string_missing_or_empty() {
        let missing = SecretPayload::from_binary(br#"{"source": "binary"}"#.to_vec());
        let empty = SecretPayload {
            secret_string: Some(String::new()),
            secret_binary: Some(br#"{"source": "binary"}"#.to_vec()),
        };

        for payload in [missing, empty] {
            let config = config_with(StaticSecrets::new().with_payload("my/secret", payload));
            let document = get_secrets_content(&config, &ClientFactory::new()).await.unwrap();
            assert_eq!(document["source"], "binary");
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_a_decode_error() {
        let config = config_with(StaticSecrets::new().with_json("my/secret", "{ username: nope"));

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::InvalidSecretJson { .. }));
        assert!(err.is_decode_error());
    }

    #[tokio::test]
    async fn test_non_object_json_is_rejected() {
        let config = config_with(StaticSecrets::new().with_json("my/secret", r#"["a", "b"]"#));

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::SecretNotAnObject { .. }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_binary() {
        let payload = SecretPayload::from_binary(vec![0xff, 0xfe, 0xfd]);
        let config = config_with(StaticSecrets::new().with_payload("my/secret", payload));

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::InvalidSecretEncoding { .. }));
    }

    #[tokio::test]
    async fn test_absent_content_is_empty_error() {
        let config = config_with(StaticSecrets::new().with_payload("my/secret", SecretPayload::default()));

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(err.is_empty_secret());
        assert!(!err.is_decode_error());
    }

    #[tokio::test]
    async fn test_missing_secret_is_not_found() {
        let config = config_with(StaticSecrets::new());

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::SecretNotFound { ref name, .. } if name == "my/secret"));
    }

    #[tokio::test]
    async fn test_service_error_is_remote() {
        let client = StaticSecrets::new()
            .with_error("my/secret", FetchError::Service("AccessDenied".to_string()));
        let config = config_with(client);

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::Remote { .. }));
    }

    #[tokio::test]
    async fn test_missing_name_fails_before_any_request() {
        let client = Arc::new(StaticSecrets::new().with_json("my/secret", CREDENTIALS));
        let config = SettingsConfig::default().with_secrets_client(client.clone());

        let err = get_secrets_content(&config, &ClientFactory::new()).await.unwrap_err();
        assert!(matches!(err, SettingsError::MissingSecretName));
        assert_eq!(client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_version_arguments_are_forwarded() {
        let client = Arc::new(StaticSecrets::new().with_json("my/secret", CREDENTIALS));
        let config = SettingsConfig::default()
            .with_secrets_name("my/secret")
            .with_secrets_version("v-123")
            .with_secrets_stage("AWSPREVIOUS")
            .with_secrets_client(client.clone());

        get_secrets_content(&config, &ClientFactory::new()).await.unwrap();

        let requests = client.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].version_id.as_deref(), Some("v-123"));
        assert_eq!(requests[0].version_stage.as_deref(), Some("AWSPREVIOUS"));
    }
}
