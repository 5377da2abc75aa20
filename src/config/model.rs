// src/config/model.rs

use serde::Deserialize;

use crate::ssh::DEFAULT_PROGRAM;
use crate::types::ReportMode;

/// Worker count used when neither the CLI nor the config file sets one.
pub const DEFAULT_WORKERS: usize = 16;

/// Configuration file as read from TOML, before validation.
///
/// ```toml
/// [defaults]
/// workers = 32
/// user = "deploy"
/// port = 2222
/// mode = "check"
/// tty = false
/// success_codes = [0, 3]
/// program = "ssh"
/// ```
///
/// Every key is optional; command-line flags override whatever is set here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub defaults: RawDefaults,
}

/// `[defaults]` section, unvalidated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawDefaults {
    pub workers: Option<usize>,
    pub user: Option<String>,
    /// Wider than `u16` so out-of-range values get a readable error.
    pub port: Option<i64>,
    pub mode: Option<String>,
    pub tty: Option<bool>,
    pub success_codes: Option<Vec<i32>>,
    pub program: Option<String>,
}

/// Validated configuration. Only obtainable through
/// `ConfigFile::try_from(RawConfigFile)` or [`ConfigFile::default`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub defaults: Defaults,
}

/// Validated `[defaults]` with every fallback applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Defaults {
    pub workers: usize,
    pub user: Option<String>,
    pub port: Option<u16>,
    pub mode: ReportMode,
    pub tty: bool,
    pub success_codes: Vec<i32>,
    pub program: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            user: None,
            port: None,
            mode: ReportMode::default(),
            tty: false,
            success_codes: vec![0],
            program: DEFAULT_PROGRAM.to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
        }
    }
}
