// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Only setup can fail. A command that cannot be started or exits badly is
//! reported through `Event::Failure` / `Event::Exit`, never as an error.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SshmuxError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("Neither stdin, nor -s/--servers given")]
    NoServers,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, SshmuxError>;
