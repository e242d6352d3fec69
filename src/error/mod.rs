//! Error types

pub mod types;

pub use types::{FetchError, Result, SettingsError};
