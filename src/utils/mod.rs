//! Utility modules

pub mod string;

pub use string::{mask_json, mask_secret, truncate_str};
