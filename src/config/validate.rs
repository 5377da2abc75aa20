// src/config/validate.rs

use crate::config::model::{ConfigFile, Defaults, RawConfigFile, RawDefaults};
use crate::errors::{Result, SshmuxError};
use crate::types::ReportMode;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SshmuxError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        Ok(ConfigFile {
            defaults: validate_defaults(raw.defaults)?,
        })
    }
}

fn validate_defaults(raw: RawDefaults) -> Result<Defaults> {
    let fallback = Defaults::default();

    let workers = match raw.workers {
        Some(0) => {
            return Err(SshmuxError::ConfigError(
                "defaults.workers must be at least 1".to_string(),
            ));
        }
        Some(n) => n,
        None => fallback.workers,
    };

    let port = raw.port.map(validate_port).transpose()?;

    let mode = match raw.mode {
        Some(mode) => mode
            .parse::<ReportMode>()
            .map_err(|e| SshmuxError::ConfigError(format!("defaults.mode: {e}")))?,
        None => fallback.mode,
    };

    let success_codes = match raw.success_codes {
        Some(codes) if codes.is_empty() => {
            return Err(SshmuxError::ConfigError(
                "defaults.success_codes must not be empty".to_string(),
            ));
        }
        Some(codes) => codes,
        None => fallback.success_codes,
    };

    let program = match raw.program {
        Some(p) if p.trim().is_empty() => {
            return Err(SshmuxError::ConfigError(
                "defaults.program must not be empty".to_string(),
            ));
        }
        Some(p) => p,
        None => fallback.program,
    };

    Ok(Defaults {
        workers,
        user: raw.user.filter(|u| !u.is_empty()),
        port,
        mode,
        tty: raw.tty.unwrap_or(fallback.tty),
        success_codes,
        program,
    })
}

fn validate_port(port: i64) -> Result<u16> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| {
            SshmuxError::ConfigError(format!(
                "defaults.port must be between 1 and 65535, got {port}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(defaults: RawDefaults) -> RawConfigFile {
        RawConfigFile { defaults }
    }

    #[test]
    fn empty_file_gets_defaults() {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        assert_eq!(cfg, ConfigFile::default());
        assert_eq!(cfg.defaults.success_codes, vec![0]);
    }

    #[test]
    fn zero_workers_rejected() {
        let err = ConfigFile::try_from(raw(RawDefaults {
            workers: Some(0),
            ..Default::default()
        }))
        .unwrap_err();
        assert!(matches!(err, SshmuxError::ConfigError(msg) if msg.contains("workers")));
    }

    #[test]
    fn port_out_of_range_rejected() {
        for port in [0, -1, 65536] {
            let err = ConfigFile::try_from(raw(RawDefaults {
                port: Some(port),
                ..Default::default()
            }))
            .unwrap_err();
            assert!(matches!(err, SshmuxError::ConfigError(msg) if msg.contains("port")));
        }
    }

    #[test]
    fn unknown_mode_rejected() {
        let err = ConfigFile::try_from(raw(RawDefaults {
            mode: Some("fancy".into()),
            ..Default::default()
        }))
        .unwrap_err();
        assert!(matches!(err, SshmuxError::ConfigError(msg) if msg.contains("fancy")));
    }

    #[test]
    fn empty_success_codes_rejected() {
        let result = ConfigFile::try_from(raw(RawDefaults {
            success_codes: Some(vec![]),
            ..Default::default()
        }));
        assert!(result.is_err());
    }
}
