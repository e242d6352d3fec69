//! Settings loading
//!
//! This module is the composition point: it decides, per settings variant,
//! which sources are layered and in which order, builds the `config` stack and
//! deserializes the result into the target type.

use std::fmt;

use config::builder::AsyncState;
use config::{Config, ConfigBuilder, Value};
use serde::de::DeserializeOwned;

use crate::config::{ClientFactory, SettingsConfig};
use crate::error::Result;
use crate::schemas::{field_names, validate_field_names, FieldSpec};
use crate::sources::{
    AwsSource, EnvironmentSource, ParameterStoreSource, RemoteSource, SecretsDirSource,
    SecretsManagerSource,
};

/// Settings variants, by remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsKind {
    /// One JSON secret supplies the fields
    SecretsManager,
    /// Annotated fields are read from the parameter store
    ParameterStore,
    /// Each annotated field picks its store
    Aws,
}

/// A layer in the settings stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceLayer {
    Init,
    SecretsManager,
    ParameterStore,
    Aws,
    Environment,
    Dotenv,
    SecretsDir,
}

impl fmt::Display for SourceLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLayer::Init => write!(f, "init"),
            SourceLayer::SecretsManager => write!(f, "secretsmanager"),
            SourceLayer::ParameterStore => write!(f, "ssm"),
            SourceLayer::Aws => write!(f, "aws"),
            SourceLayer::Environment => write!(f, "environment"),
            SourceLayer::Dotenv => write!(f, "dotenv"),
            SourceLayer::SecretsDir => write!(f, "secrets_dir"),
        }
    }
}

impl SettingsKind {
    /// Source layers, highest precedence first
    pub fn layers(self) -> [SourceLayer; 5] {
        let remote = match self {
            SettingsKind::SecretsManager => SourceLayer::SecretsManager,
            SettingsKind::ParameterStore => SourceLayer::ParameterStore,
            SettingsKind::Aws => SourceLayer::Aws,
        };

        [
            SourceLayer::Init,
            remote,
            SourceLayer::Environment,
            SourceLayer::Dotenv,
            SourceLayer::SecretsDir,
        ]
    }
}

/// Builds the layered settings of one settings type
#[derive(Debug, Clone)]
pub struct SettingsLoader {
    kind: SettingsKind,
    config: SettingsConfig,
    fields: Vec<FieldSpec>,
    init: Vec<(String, Value)>,
    factory: ClientFactory,
}

impl SettingsLoader {
    pub fn new(kind: SettingsKind, config: SettingsConfig, fields: Vec<FieldSpec>) -> Self {
        Self {
            kind,
            config,
            fields,
            init: Vec::new(),
            factory: ClientFactory::global().clone(),
        }
    }

    /// Use a dedicated client factory instead of the process-wide one
    pub fn with_factory(mut self, factory: ClientFactory) -> Self {
        self.factory = factory;
        self
    }

    /// Explicit value for `key`; wins over every other source
    pub fn with_init(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.init.push((key.into(), value.into()));
        self
    }

    pub fn kind(&self) -> SettingsKind {
        self.kind
    }

    /// Build the merged settings stack
    pub async fn build(&self) -> Result<Config> {
        validate_field_names(&self.fields)?;

        let names = field_names(&self.fields);
        let mut builder = ConfigBuilder::<AsyncState>::default();

        // `config` lets later sources win, so add the lowest layer first
        for layer in self.kind.layers().into_iter().rev() {
            tracing::trace!(layer = %layer, "Adding settings layer");

            builder = match layer {
                SourceLayer::Init => {
                    for (key, value) in &self.init {
                        builder = builder.set_override(key, value.clone())?;
                    }
                    builder
                }
                SourceLayer::SecretsManager => builder.add_async_source(RemoteSource(
                    SecretsManagerSource::new(self.config.clone(), self.factory.clone(), self.fields.clone()),
                )),
                SourceLayer::ParameterStore => builder.add_async_source(RemoteSource(
                    ParameterStoreSource::new(self.config.clone(), self.factory.clone(), self.fields.clone()),
                )),
                SourceLayer::Aws => builder.add_async_source(RemoteSource(AwsSource::new(
                    self.config.clone(),
                    self.factory.clone(),
                    self.fields.clone(),
                ))),
                SourceLayer::Environment => {
                    builder.add_source(EnvironmentSource::from_process(&self.config, names.clone()))
                }
                SourceLayer::Dotenv => match &self.config.env_file {
                    Some(path) => builder.add_source(EnvironmentSource::from_dotenv(
                        path,
                        &self.config,
                        names.clone(),
                    )?),
                    None => builder,
                },
                SourceLayer::SecretsDir => match &self.config.secrets_dir {
                    Some(dir) => {
                        let mut source = SecretsDirSource::new(dir, names.clone());
                        if let Some(prefix) = &self.config.env_prefix {
                            source = source.with_prefix(prefix);
                        }
                        builder.add_source(source)
                    }
                    None => builder,
                },
            };
        }

        let config = builder.build().await?;
        tracing::debug!(kind = ?self.kind, fields = self.fields.len(), "Settings sources resolved");

        Ok(config)
    }

    /// Build the settings stack and deserialize it into `T`
    pub async fn load<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(self.build().await?.try_deserialize()?)
    }
}

/// A settings type: its source configuration and field list
pub trait BaseSettings: DeserializeOwned {
    fn settings_config() -> SettingsConfig {
        SettingsConfig::default()
    }

    fn fields() -> Vec<FieldSpec>;

    fn loader(kind: SettingsKind) -> SettingsLoader {
        SettingsLoader::new(kind, Self::settings_config(), Self::fields())
    }
}

/// Settings whose remote values come from one JSON secret
#[allow(async_fn_in_trait)]
pub trait SecretsManagerBaseSettings: BaseSettings {
    async fn load() -> Result<Self> {
        Self::loader(SettingsKind::SecretsManager).load().await
    }
}

/// Settings whose annotated fields come from the parameter store
#[allow(async_fn_in_trait)]
pub trait ParameterStoreBaseSettings: BaseSettings {
    async fn load() -> Result<Self> {
        Self::loader(SettingsKind::ParameterStore).load().await
    }
}

/// Settings whose annotated fields come from either store
#[allow(async_fn_in_trait)]
pub trait AwsBaseSettings: BaseSettings {
    async fn load() -> Result<Self> {
        Self::loader(SettingsKind::Aws).load().await
    }
}
