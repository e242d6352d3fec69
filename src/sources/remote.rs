//! Remote settings sources
//!
//! Adapters that answer field lookups from Secrets Manager and the SSM
//! Parameter Store. They are plugged into the `config` crate through
//! [`RemoteSource`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use config::{AsyncSource, ConfigError, Map, Value};
use serde_json::Value as JsonValue;
use tokio::sync::{Mutex, OnceCell};

use crate::config::{ClientFactory, SettingsConfig};
use crate::error::Result;
use crate::schemas::{FieldSpec, SecretArgs, SecretHint};
use crate::services::{
    fetch_secret_document, get_secrets_content, ParameterResolver, SecretDocument,
};
use crate::sources::json_to_value;

/// Field lookup contract of a settings source.
///
/// `Ok(None)` (or a JSON null) means the source has no value for the field and
/// the next source should be consulted. Errors are reserved for real failures.
#[async_trait]
pub trait FieldValueSource: fmt::Debug + Send + Sync {
    /// Name recorded as the origin of every value this source produces
    fn origin(&self) -> String;

    /// Fields this source is asked about
    fn fields(&self) -> &[FieldSpec];

    async fn get_field_value(&self, field: &FieldSpec) -> Result<Option<JsonValue>>;

    /// Look up every field and keep the ones that have a value
    async fn collect_fields(&self) -> Result<Map<String, Value>> {
        let origin = self.origin();
        let mut values = Map::new();

        for field in self.fields() {
            match self.get_field_value(field).await? {
                None | Some(JsonValue::Null) => {
                    tracing::trace!(source = %origin, field = %field.name, "No value");
                }
                Some(value) => {
                    values.insert(field.name.clone(), json_to_value(&origin, value));
                }
            }
        }

        tracing::debug!(source = %origin, resolved = values.len(), "Collected remote settings");
        Ok(values)
    }
}

/// Adapter exposing a [`FieldValueSource`] to the `config` crate
#[derive(Debug)]
pub struct RemoteSource<S>(pub S);

#[async_trait]
impl<S> AsyncSource for RemoteSource<S>
where
    S: FieldValueSource + 'static,
{
    async fn collect(&self) -> std::result::Result<Map<String, Value>, ConfigError> {
        Ok(self.0.collect_fields().await?)
    }
}

/// Fields read from a single JSON secret named by the settings config
pub struct SecretsManagerSource {
    config: SettingsConfig,
    factory: ClientFactory,
    fields: Vec<FieldSpec>,
    document: OnceCell<SecretDocument>,
}

impl SecretsManagerSource {
    pub fn new(config: SettingsConfig, factory: ClientFactory, fields: Vec<FieldSpec>) -> Self {
        Self {
            config,
            factory,
            fields,
            document: OnceCell::new(),
        }
    }

    /// The secret document, fetched on first use
    pub async fn document(&self) -> Result<&SecretDocument> {
        self.document
            .get_or_try_init(|| get_secrets_content(&self.config, &self.factory))
            .await
    }
}

// Documents hold secret values and stay out of debug output
impl fmt::Debug for SecretsManagerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsManagerSource")
            .field("config", &self.config)
            .field("fields", &self.fields)
            .field("fetched", &self.document.initialized())
            .finish()
    }
}

#[async_trait]
impl FieldValueSource for SecretsManagerSource {
    fn origin(&self) -> String {
        match &self.config.secrets_name {
            Some(name) => format!("secretsmanager:{}", name),
            None => "secretsmanager".to_string(),
        }
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    async fn get_field_value(&self, field: &FieldSpec) -> Result<Option<JsonValue>> {
        Ok(document_value(self.document().await?, &field.name))
    }
}

/// Fields read one by one from the parameter store
#[derive(Debug)]
pub struct ParameterStoreSource {
    resolver: ParameterResolver,
    fields: Vec<FieldSpec>,
}

impl ParameterStoreSource {
    pub fn new(config: SettingsConfig, factory: ClientFactory, fields: Vec<FieldSpec>) -> Self {
        Self {
            resolver: ParameterResolver::new(config, factory),
            fields,
        }
    }
}

#[async_trait]
impl FieldValueSource for ParameterStoreSource {
    fn origin(&self) -> String {
        "ssm".to_string()
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    async fn get_field_value(&self, field: &FieldSpec) -> Result<Option<JsonValue>> {
        let Some(hint) = field.parameter_hint() else {
            return Ok(None);
        };

        let value = self.resolver.resolve(&field.name, hint).await?;
        Ok(value.map(JsonValue::String))
    }
}

/// Value of `key` in a secret document.
///
/// Keys match ignoring case; an exact match wins.
fn document_value(document: &SecretDocument, key: &str) -> Option<JsonValue> {
    if let Some(value) = document.get(key) {
        return Some(value.clone());
    }

    let key = key.to_lowercase();
    document
        .iter()
        .find(|(candidate, _)| candidate.to_lowercase() == key)
        .map(|(_, value)| value.clone())
}

/// A secret version as read through one particular client
type DocumentKey = (SecretArgs, Option<usize>);

/// Fields dispatched per hint to either store
///
/// A secret hint yields the whole secret document, or one key of it. Each
/// distinct secret is fetched once per client, so hints that point the same
/// secret id at different accounts stay apart. Fields without a hint are
/// skipped.
pub struct AwsSource {
    config: SettingsConfig,
    factory: ClientFactory,
    parameters: ParameterResolver,
    fields: Vec<FieldSpec>,
    documents: Mutex<HashMap<DocumentKey, SecretDocument>>,
}

impl AwsSource {
    pub fn new(config: SettingsConfig, factory: ClientFactory, fields: Vec<FieldSpec>) -> Self {
        Self {
            parameters: ParameterResolver::new(config.clone(), factory.clone()),
            config,
            factory,
            fields,
            documents: Mutex::new(HashMap::new()),
        }
    }

    async fn secret_document(&self, hint: &SecretHint) -> Result<SecretDocument> {
        let client_id = hint
            .client
            .as_ref()
            .map(|client| Arc::as_ptr(client) as *const () as usize);
        let key = (hint.args.clone(), client_id);

        let mut documents = self.documents.lock().await;
        if let Some(document) = documents.get(&key) {
            return Ok(document.clone());
        }

        let client = match &hint.client {
            Some(client) => client.clone(),
            None => self.factory.secrets_fetcher(&self.config).await,
        };
        let document = fetch_secret_document(client.as_ref(), &hint.args).await?;
        documents.insert(key, document.clone());

        Ok(document)
    }
}

impl fmt::Debug for AwsSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsSource")
            .field("config", &self.config)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FieldValueSource for AwsSource {
    fn origin(&self) -> String {
        "aws".to_string()
    }

    fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    async fn get_field_value(&self, field: &FieldSpec) -> Result<Option<JsonValue>> {
        if let Some(hint) = field.parameter_hint() {
            let value = self.parameters.resolve(&field.name, hint).await?;
            return Ok(value.map(JsonValue::String));
        }

        if let Some(hint) = field.secret_hint() {
            let document = self.secret_document(hint).await?;
            return Ok(match &hint.key {
                Some(key) => document_value(&document, key),
                None => Some(JsonValue::Object(document)),
            });
        }

        Ok(None)
    }
}
