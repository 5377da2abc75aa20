// src/config/mod.rs

//! Optional TOML file with default settings.
//!
//! - [`model`] holds the raw serde model and the validated one.
//! - [`validate`] turns the former into the latter.
//! - [`loader`] finds and reads the file.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_or_default, resolve_config_path};
pub use model::{ConfigFile, DEFAULT_WORKERS, Defaults, RawConfigFile, RawDefaults};
