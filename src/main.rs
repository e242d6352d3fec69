//! AWS Settings
//!
//! Resolves settings the way a settings type would, from Secrets Manager or
//! the SSM Parameter Store layered with the environment, a dotenv file and a
//! secrets directory, and prints the result as JSON.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_settings::{
    config::{ClientFactory, SettingsConfig},
    loader::{SettingsKind, SettingsLoader},
    schemas::FieldSpec,
    services::{get_secrets_content, CachedSecrets},
    utils::mask_json,
};
use clap::{Args as ClapArgs, Parser, Subcommand};
use serde_json::Value as JsonValue;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Leading characters left visible when masking values
const VISIBLE_CHARS: usize = 2;

/// AWS Settings
///
/// Resolve application settings from AWS and local sources.
#[derive(Parser, Debug)]
#[command(name = "aws-settings")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    aws: AwsArgs,

    #[command(flatten)]
    local: LocalArgs,

    /// Log level: trace, debug, info, warn, error (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Print values in clear text instead of masking them
    #[arg(long)]
    reveal: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve fields from a JSON secret in Secrets Manager
    Secrets {
        /// Secret name or ARN
        #[arg(long)]
        name: String,

        /// Secret version id
        #[arg(long)]
        version: Option<String>,

        /// Secret version stage, e.g. AWSCURRENT
        #[arg(long)]
        stage: Option<String>,

        /// Field to resolve (repeatable); defaults to every key of the secret
        #[arg(long = "field")]
        fields: Vec<String>,
    },

    /// Resolve fields from the SSM Parameter Store
    Parameters {
        /// FIELD to read the parameter named FIELD, or FIELD=PATH
        #[arg(required = true)]
        parameters: Vec<String>,

        /// Do not decrypt SecureString parameters
        #[arg(long)]
        no_decryption: bool,
    },
}

#[derive(ClapArgs, Debug)]
struct AwsArgs {
    /// AWS region (defaults to the standard region chain)
    #[arg(long, env = "AWS_REGION")]
    region: Option<String>,

    /// AWS profile name
    #[arg(long, env = "AWS_PROFILE")]
    profile: Option<String>,

    /// Custom endpoint URL, e.g. http://localhost:4566 for LocalStack
    #[arg(long, env = "AWS_ENDPOINT_URL")]
    endpoint_url: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct LocalArgs {
    /// Prefix of environment variables that feed the settings
    #[arg(long)]
    env_prefix: Option<String>,

    /// Delimiter of nested keys in environment variables, e.g. __
    #[arg(long)]
    env_nested_delimiter: Option<String>,

    /// Dotenv file layered below the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Directory of secret files layered below the dotenv file
    #[arg(long)]
    secrets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(&args.log_level);

    let config = settings_config(&args);
    let factory = ClientFactory::global().clone();

    let (kind, config, fields) = match &args.command {
        Command::Secrets {
            name,
            version,
            stage,
            fields,
        } => {
            let mut config = config.with_secrets_name(name);
            config.secrets_version = version.clone();
            config.secrets_stage = stage.clone();

            // Key discovery and loading share one read of the secret
            let client = factory.secrets_fetcher(&config).await;
            let config = config.with_secrets_client(Arc::new(CachedSecrets::new(client)));

            let fields = if fields.is_empty() {
                let document = get_secrets_content(&config, &factory)
                    .await
                    .with_context(|| format!("Failed to read secret {}", name))?;
                document
                    .keys()
                    .map(|key| FieldSpec::new(key.to_lowercase()))
                    .collect()
            } else {
                fields
                    .iter()
                    .map(|field| FieldSpec::new(field.to_lowercase()))
                    .collect()
            };

            (SettingsKind::SecretsManager, config, fields)
        }
        Command::Parameters {
            parameters,
            no_decryption,
        } => {
            let fields = parameters.iter().map(|p| parse_parameter(p)).collect();
            (
                SettingsKind::ParameterStore,
                config.with_ssm_decryption(!no_decryption),
                fields,
            )
        }
    };

    tracing::info!(kind = ?kind, "Resolving settings");

    let resolved: BTreeMap<String, JsonValue> = SettingsLoader::new(kind, config, fields)
        .with_factory(factory)
        .load()
        .await
        .context("Failed to resolve settings")?;

    let mut output = serde_json::to_value(resolved)?;
    if !args.reveal {
        mask_json(&mut output, VISIBLE_CHARS);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn settings_config(args: &Args) -> SettingsConfig {
    SettingsConfig {
        aws_region: args.aws.region.clone(),
        aws_profile: args.aws.profile.clone(),
        aws_endpoint_url: args.aws.endpoint_url.clone(),
        env_prefix: args.local.env_prefix.clone(),
        env_nested_delimiter: args.local.env_nested_delimiter.clone(),
        env_file: args.local.env_file.clone(),
        secrets_dir: args.local.secrets_dir.clone(),
        ..SettingsConfig::default()
    }
}

/// `FIELD` or `FIELD=PATH`; a bare name is kept as the parameter path
fn parse_parameter(spec: &str) -> FieldSpec {
    match spec.split_once('=') {
        Some((field, path)) => FieldSpec::parameter_at(field.to_lowercase(), path),
        None => FieldSpec::parameter_at(spec.to_lowercase(), spec),
    }
}

/// Initialize tracing subscriber with the specified log level
///
/// Logs go to stderr as JSON so stdout only carries the resolved settings.
fn init_tracing(log_level: &str) {
    // Build filter from RUST_LOG env var or use provided log level
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let console_layer = fmt::layer()
        .json()
        .with_writer(std::io::stderr)
        .with_filter(filter);

    tracing_subscriber::registry().with(console_layer).init();
}
