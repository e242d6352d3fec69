//! In-memory fetchers for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::schemas::SecretArgs;
use crate::services::{ParameterFetcher, SecretPayload, SecretsFetcher};

/// Serves secrets by id and records the requests it saw
#[derive(Default)]
pub struct StaticSecrets {
    secrets: HashMap<String, Result<SecretPayload, FetchError>>,
    pub requests: Mutex<Vec<SecretArgs>>,
}

impl StaticSecrets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, id: &str, content: &str) -> Self {
        self.with_payload(id, SecretPayload::from_string(content))
    }

    pub fn with_payload(mut self, id: &str, payload: SecretPayload) -> Self {
        self.secrets.insert(id.to_string(), Ok(payload));
        self
    }

    pub fn with_error(mut self, id: &str, error: FetchError) -> Self {
        self.secrets.insert(id.to_string(), Err(error));
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl SecretsFetcher for StaticSecrets {
    async fn fetch_secret(&self, args: &SecretArgs) -> Result<SecretPayload, FetchError> {
        self.requests.lock().unwrap().push(args.clone());
        self.secrets
            .get(&args.secret_id)
            .cloned()
            .unwrap_or_else(|| Err(FetchError::NotFound(args.secret_id.clone())))
    }
}

/// Serves parameters by name and counts calls
#[derive(Default)]
pub struct StaticParameters {
    values: HashMap<String, Option<String>>,
    failing: HashMap<String, String>,
    calls: AtomicUsize,
    pub names: Mutex<Vec<String>>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), Some(value.to_string()));
        self
    }

    pub fn with_empty(mut self, name: &str) -> Self {
        self.values.insert(name.to_string(), None);
        self
    }

    pub fn with_failure(mut self, name: &str, message: &str) -> Self {
        self.failing.insert(name.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParameterFetcher for StaticParameters {
    async fn fetch_parameter(
        &self,
        name: &str,
        _with_decryption: bool,
    ) -> Result<Option<String>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.names.lock().unwrap().push(name.to_string());

        if let Some(message) = self.failing.get(name) {
            return Err(FetchError::Service(message.clone()));
        }

        match self.values.get(name) {
            Some(value) => Ok(value.clone()),
            None => Err(FetchError::NotFound(name.to_string())),
        }
    }
}

/// Sets an environment variable and removes it again on drop
pub struct EnvVarGuard {
    key: String,
}

impl EnvVarGuard {
    pub fn set(key: &str, value: &str) -> Self {
        std::env::set_var(key, value);
        Self {
            key: key.to_string(),
        }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        std::env::remove_var(&self.key);
    }
}
