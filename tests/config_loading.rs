use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use sshmux::Settings;
use sshmux::cli::CliArgs;
use sshmux::config::{ConfigFile, DEFAULT_WORKERS, load_and_validate, load_or_default};
use sshmux::errors::SshmuxError;
use sshmux::types::ReportMode;

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn loads_defaults_section() {
    let file = config_file(
        r#"
[defaults]
workers = 4
user = "deploy"
port = 2222
mode = "check-no"
tty = true
success_codes = [0, 255]
program = "/usr/bin/ssh"
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();
    let d = &cfg.defaults;
    assert_eq!(d.workers, 4);
    assert_eq!(d.user.as_deref(), Some("deploy"));
    assert_eq!(d.port, Some(2222));
    assert_eq!(d.mode, ReportMode::CheckNo);
    assert!(d.tty);
    assert_eq!(d.success_codes, vec![0, 255]);
    assert_eq!(d.program, "/usr/bin/ssh");
}

#[test]
fn empty_file_means_builtin_defaults() {
    let file = config_file("");
    let cfg = load_and_validate(file.path()).unwrap();
    assert_eq!(cfg.defaults.workers, DEFAULT_WORKERS);
    assert_eq!(cfg, ConfigFile::default());
}

#[test]
fn unknown_keys_are_rejected() {
    let file = config_file("[defaults]\nthreads = 3\n");
    let result = load_and_validate(file.path());
    assert!(matches!(result, Err(SshmuxError::TomlError(_))));
}

#[test]
fn invalid_values_are_config_errors() {
    let file = config_file("[defaults]\nport = 70000\n");
    match load_and_validate(file.path()) {
        Err(SshmuxError::ConfigError(msg)) => assert!(msg.contains("70000")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn missing_explicit_file_is_an_io_error() {
    let result = load_or_default(Some(std::path::Path::new("/nonexistent/sshmux.toml")));
    assert!(matches!(result, Err(SshmuxError::IoError(_))));
}

#[test]
fn cli_flags_override_the_file() {
    let file = config_file("[defaults]\nworkers = 4\nuser = \"deploy\"\nport = 2222\nmode = \"exit\"\n");
    let cfg = load_and_validate(file.path()).unwrap();

    let args = CliArgs::try_parse_from([
        "sshmux", "-w", "8", "-u", "admin", "-p", "0", "-m", "plain", "--ok-code", "3", "uptime",
    ])
    .unwrap();
    let s = Settings::resolve(&args, &cfg).unwrap();

    assert_eq!(s.workers, 8);
    assert_eq!(s.builder.user.as_deref(), Some("admin"));
    assert_eq!(s.builder.port, None);
    assert_eq!(s.mode, ReportMode::Plain);
    assert_eq!(s.success_codes, vec![3]);
    assert_eq!(s.builder.command, "uptime");
}

#[test]
fn file_fills_in_missing_flags() {
    let file = config_file("[defaults]\nworkers = 4\nport = 2222\nmode = \"exit\"\n");
    let cfg = load_and_validate(file.path()).unwrap();

    let args = CliArgs::try_parse_from(["sshmux", "uptime"]).unwrap();
    let s = Settings::resolve(&args, &cfg).unwrap();

    assert_eq!(s.workers, 4);
    assert_eq!(s.builder.port, Some(2222));
    assert_eq!(s.mode, ReportMode::Exit);
    assert_eq!(s.success_codes, vec![0]);
    assert_eq!(s.builder.program, "ssh");
}

#[test]
fn flag_validation_errors() {
    let cfg = ConfigFile::default();

    let args = CliArgs::try_parse_from(["sshmux", "-w", "0", "x"]).unwrap();
    match Settings::resolve(&args, &cfg) {
        Err(SshmuxError::InvalidArgument(msg)) => assert_eq!(msg, "Must use at least one worker"),
        other => panic!("unexpected {other:?}"),
    }

    let args = CliArgs::try_parse_from(["sshmux", "-p", "65536", "x"]).unwrap();
    match Settings::resolve(&args, &cfg) {
        Err(SshmuxError::InvalidArgument(msg)) => assert_eq!(msg, "Invalid default port"),
        other => panic!("unexpected {other:?}"),
    }

    let args = CliArgs::try_parse_from(["sshmux", "-m", "loud", "x"]).unwrap();
    match Settings::resolve(&args, &cfg) {
        Err(SshmuxError::InvalidArgument(msg)) => assert_eq!(msg, "Unknown report mode: loud"),
        other => panic!("unexpected {other:?}"),
    }
}
