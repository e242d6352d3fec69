//! Settings field descriptions
//!
//! A settings type lists its fields as [`FieldSpec`]s. Fields that should be
//! resolved remotely carry a [`RemoteHint`] naming the store and, optionally,
//! an explicit remote name and client.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, SettingsError};
use crate::schemas::SecretArgs;
use crate::services::{ParameterFetcher, SecretsFetcher};

/// Per-field parameter store lookup
#[derive(Clone, Default)]
pub struct ParameterHint {
    /// Parameter path; the field name is used when absent
    pub name: Option<String>,

    /// Client dedicated to this field
    pub client: Option<Arc<dyn ParameterFetcher>>,
}

impl ParameterHint {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            client: None,
        }
    }

    pub fn with_client(mut self, client: Arc<dyn ParameterFetcher>) -> Self {
        self.client = Some(client);
        self
    }
}

impl fmt::Debug for ParameterHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterHint")
            .field("name", &self.name)
            .field("client", &self.client.is_some())
            .finish()
    }
}

/// Per-field secrets manager lookup, used by the combined source
#[derive(Clone)]
pub struct SecretHint {
    pub args: SecretArgs,

    /// Pick a single key out of the secret document instead of the whole document
    pub key: Option<String>,

    pub client: Option<Arc<dyn SecretsFetcher>>,
}

impl SecretHint {
    pub fn new(args: SecretArgs) -> Self {
        Self {
            args,
            key: None,
            client: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_client(mut self, client: Arc<dyn SecretsFetcher>) -> Self {
        self.client = Some(client);
        self
    }
}

impl fmt::Debug for SecretHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHint")
            .field("args", &self.args)
            .field("key", &self.key)
            .field("client", &self.client.is_some())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum RemoteHint {
    Parameter(ParameterHint),
    Secret(SecretHint),
}

/// A named settings field
///
/// Settings keys are case-insensitive: names must be lowercase, and remote
/// document keys, environment variables and secret files match them ignoring
/// case. A secret key `UserName` therefore feeds the field `username`.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub hint: Option<RemoteHint>,
}

impl FieldSpec {
    /// A field with no remote lookup
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hint: None,
        }
    }

    /// A field resolved from the parameter store under its own name
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::new(name).with_hint(RemoteHint::Parameter(ParameterHint::default()))
    }

    /// A field resolved from the parameter store at `path`
    pub fn parameter_at(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name).with_hint(RemoteHint::Parameter(ParameterHint::named(path)))
    }

    /// A field resolved from its own secret
    pub fn secret(name: impl Into<String>, hint: SecretHint) -> Self {
        Self::new(name).with_hint(RemoteHint::Secret(hint))
    }

    pub fn with_hint(mut self, hint: RemoteHint) -> Self {
        self.hint = Some(hint);
        self
    }

    pub fn parameter_hint(&self) -> Option<&ParameterHint> {
        match &self.hint {
            Some(RemoteHint::Parameter(hint)) => Some(hint),
            _ => None,
        }
    }

    pub fn secret_hint(&self) -> Option<&SecretHint> {
        match &self.hint {
            Some(RemoteHint::Secret(hint)) => Some(hint),
            _ => None,
        }
    }
}

/// Field names of a schema
pub fn field_names(fields: &[FieldSpec]) -> Vec<String> {
    fields.iter().map(|field| field.name.clone()).collect()
}

/// Reject field names the merged settings could never produce
pub fn validate_field_names(fields: &[FieldSpec]) -> Result<()> {
    match fields
        .iter()
        .find(|field| field.name.chars().any(char::is_uppercase))
    {
        Some(field) => Err(SettingsError::InvalidFieldName {
            name: field.name.clone(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_constructors() {
        let by_name = FieldSpec::parameter("db_host");
        let hint = by_name.parameter_hint().unwrap();
        assert_eq!(hint.name, None);
        assert!(by_name.secret_hint().is_none());

        let by_path = FieldSpec::parameter_at("db_host", "/app/db/host");
        assert_eq!(
            by_path.parameter_hint().unwrap().name.as_deref(),
            Some("/app/db/host")
        );
    }

    #[test]
    fn test_plain_field_has_no_hint() {
        let field = FieldSpec::new("debug");
        assert!(field.parameter_hint().is_none());
        assert!(field.secret_hint().is_none());
    }

    #[test]
    fn test_uppercase_field_names_are_rejected() {
        let fields = vec![FieldSpec::new("username"), FieldSpec::new("apiKey")];
        let err = validate_field_names(&fields).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidFieldName { ref name } if name == "apiKey"));

        let fields = vec![FieldSpec::new("api_key"), FieldSpec::new("db_2")];
        assert!(validate_field_names(&fields).is_ok());
    }

    #[test]
    fn test_secret_hint() {
        let field = FieldSpec::secret(
            "database",
            SecretHint::new(SecretArgs::new("app/db")).with_key("password"),
        );
        let hint = field.secret_hint().unwrap();
        assert_eq!(hint.args.secret_id, "app/db");
        assert_eq!(hint.key.as_deref(), Some("password"));
    }
}
