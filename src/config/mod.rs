//! Configuration management module
//!
//! This module holds the per-settings-type [`SettingsConfig`] and the AWS SDK
//! client factory built from it.

pub mod aws;
pub mod settings;

pub use aws::{
    build_aws_config, AwsConfigBuilder, ClientFactory, SECRETS_MANAGER_SERVICE, SSM_SERVICE,
};
pub use settings::SettingsConfig;
