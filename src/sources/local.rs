//! Local settings sources
//!
//! Environment variables, dotenv files and secret-file mounts. Only keys that
//! belong to a declared field are kept, so unrelated variables in the process
//! environment never reach deserialization.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use config::{ConfigError, Environment, Map, Source, Value};

use crate::config::SettingsConfig;
use crate::error::{Result, SettingsError};

/// Environment variables, from the process or from a dotenv file.
///
/// Keys are matched case-insensitively. With `env_prefix` set only prefixed
/// variables are read and the prefix is stripped; with `env_nested_delimiter`
/// set, `DB__HOST` feeds the `host` key of the `db` field.
#[derive(Debug, Clone)]
pub struct EnvironmentSource {
    inner: Environment,
    fields: Vec<String>,
}

impl EnvironmentSource {
    /// Read from the process environment
    pub fn from_process(config: &SettingsConfig, fields: Vec<String>) -> Self {
        Self {
            inner: environment(config),
            fields: fields.iter().map(|field| field.to_lowercase()).collect(),
        }
    }

    /// Read from a dotenv file without touching the process environment.
    ///
    /// A missing file yields no values.
    pub fn from_dotenv(path: &Path, config: &SettingsConfig, fields: Vec<String>) -> Result<Self> {
        let pairs = read_dotenv(path)?;
        let mut source = Self::from_process(config, fields);
        source.inner = source.inner.source(Some(pairs));
        Ok(source)
    }

    fn is_declared(&self, key: &str) -> bool {
        self.fields.iter().any(|field| {
            key == field
                || key
                    .strip_prefix(field.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

impl Source for EnvironmentSource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<Map<String, Value>, ConfigError> {
        let values = self.inner.collect()?;
        Ok(values
            .into_iter()
            .filter(|(key, _)| self.is_declared(key))
            .collect())
    }
}

fn environment(config: &SettingsConfig) -> Environment {
    let mut env = match &config.env_prefix {
        Some(prefix) => Environment::with_prefix(prefix).prefix_separator(""),
        None => Environment::default(),
    };

    if let Some(delimiter) = &config.env_nested_delimiter {
        env = env.separator(delimiter);
    }

    env
}

fn read_dotenv(path: &Path) -> Result<Map<String, String>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(err)) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "Dotenv file not found, skipping");
            return Ok(Map::new());
        }
        Err(source) => {
            return Err(SettingsError::Dotenv {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    iter.map(|item| {
        item.map_err(|source| SettingsError::Dotenv {
            path: path.to_path_buf(),
            source,
        })
    })
    .collect()
}

/// Secret-file mounts: one file per field, named after the field
///
/// With a prefix set, the file for `token` is `<prefix>token`, mirroring the
/// environment variable names. File names match case-insensitively and
/// contents are trimmed. A missing directory yields no values.
#[derive(Debug, Clone)]
pub struct SecretsDirSource {
    dir: PathBuf,
    prefix: String,
    fields: Vec<String>,
}

impl SecretsDirSource {
    pub fn new(dir: impl Into<PathBuf>, fields: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: String::new(),
            fields,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    fn dir_error(&self, source: io::Error) -> SettingsError {
        SettingsError::SecretsDir {
            path: self.dir.clone(),
            source,
        }
    }

    fn read(&self) -> Result<Map<String, Value>> {
        let mut values = Map::new();

        if !self.dir.exists() {
            tracing::warn!(path = %self.dir.display(), "Secrets directory does not exist");
            return Ok(values);
        }
        if !self.dir.is_dir() {
            return Err(self.dir_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "path is not a directory",
            )));
        }

        let mut files = HashMap::new();
        for entry in fs::read_dir(&self.dir).map_err(|err| self.dir_error(err))? {
            let path = entry.map_err(|err| self.dir_error(err))?.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
                files.insert(name.to_lowercase(), path.clone());
            }
        }

        let origin = self.dir.display().to_string();
        for field in &self.fields {
            let file_name = format!("{}{}", self.prefix, field).to_lowercase();
            if let Some(path) = files.get(&file_name) {
                let content = fs::read_to_string(path).map_err(|err| self.dir_error(err))?;
                values.insert(
                    field.clone(),
                    Value::new(Some(&origin), content.trim().to_string()),
                );
            }
        }

        Ok(values)
    }
}

impl Source for SecretsDirSource {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> std::result::Result<Map<String, Value>, ConfigError> {
        Ok(self.read()?)
    }
}
