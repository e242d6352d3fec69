//! Settings sources
//!
//! Every source the loader layers: the remote adapters backed by AWS and the
//! local environment, dotenv and secret-file sources.

pub mod local;
pub mod remote;
pub mod value;

pub use local::{EnvironmentSource, SecretsDirSource};
pub use remote::{
    AwsSource, FieldValueSource, ParameterStoreSource, RemoteSource, SecretsManagerSource,
};
pub use value::json_to_value;
