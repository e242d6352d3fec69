//! AWS Settings library
//!
//! Typed application settings resolved from AWS Secrets Manager and the SSM
//! Parameter Store, layered with explicit values, the environment, a dotenv
//! file and a secrets directory.

// Public modules
pub mod config;
pub mod error;
pub mod loader;
pub mod schemas;
pub mod services;
pub mod sources;
pub mod utils;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::{ClientFactory, SettingsConfig};
pub use error::{Result, SettingsError};
pub use loader::{
    AwsBaseSettings, BaseSettings, ParameterStoreBaseSettings, SecretsManagerBaseSettings,
    SettingsKind, SettingsLoader,
};
pub use schemas::{FieldSpec, ParameterHint, SecretArgs, SecretHint};
