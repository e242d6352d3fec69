//! Settings data models
//!
//! Request arguments for the remote stores and the field descriptions a
//! settings type declares.

pub mod args;
pub mod field;

pub use args::{AwsSession, SecretArgs};
pub use field::{
    field_names, validate_field_names, FieldSpec, ParameterHint, RemoteHint, SecretHint,
};
