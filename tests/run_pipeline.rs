use clap::Parser;
use tokio_util::sync::CancellationToken;

use sshmux::cli::CliArgs;
use sshmux::config::ConfigFile;
use sshmux::report::Report;
use sshmux::{Settings, execute};
use sshmux_test_utils::{init_tracing, with_timeout};

fn settings(argv: &[&str]) -> Settings {
    let args = CliArgs::try_parse_from(argv).unwrap();
    Settings::resolve(&args, &ConfigFile::default()).unwrap()
}

async fn run(settings: &Settings, servers: &'static [u8]) -> (bool, String, String) {
    init_tracing();
    let mut report = Report::new(settings.mode, Vec::<u8>::new(), Vec::<u8>::new())
        .with_success_codes(settings.success_codes.iter().copied());

    with_timeout(execute(settings, servers, CancellationToken::new(), &mut report))
        .await
        .unwrap();

    let success = report.success();
    let (out, err) = report.into_writers();
    (
        success,
        String::from_utf8(out).unwrap(),
        String::from_utf8(err).unwrap(),
    )
}

fn sorted_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.lines().collect();
    lines.sort_unstable();
    lines
}

// `echo` stands in for the ssh client, so every "remote" just prints the
// arguments it was given.

#[tokio::test]
async fn host_mode_prefixes_output_per_server() {
    let s = settings(&["sshmux", "--ssh-program", "echo", "-w", "2", "uptime"]);
    let (success, out, err) = run(&s, b"web1\nweb2\nroot@db:2222\n").await;

    assert!(success);
    assert_eq!(err, "");
    assert_eq!(
        sorted_lines(&out),
        vec![
            "root@db:2222: -p 2222 root@db uptime",
            "web1: web1 uptime",
            "web2: web2 uptime",
        ]
    );
}

#[tokio::test]
async fn default_user_and_port_reach_the_client() {
    let s = settings(&[
        "sshmux", "--ssh-program", "echo", "-m", "plain", "-u", "deploy", "-p", "22", "-t", "ls",
    ]);
    let (_, out, _) = run(&s, b"app\n").await;

    assert_eq!(out, "-p 22 -tt -l deploy app ls\n");
}

#[tokio::test]
async fn failing_client_is_reported() {
    let s = settings(&["sshmux", "--ssh-program", "false", "-m", "check", "true"]);
    let (success, out, _) = run(&s, b"a\nb\n").await;

    assert!(!success);
    assert_eq!(sorted_lines(&out), vec!["a: x", "b: x"]);
}

#[tokio::test]
async fn ok_codes_widen_success() {
    let s = settings(&["sshmux", "--ssh-program", "false", "-m", "exit", "--ok-code", "1", "x"]);
    let (success, out, _) = run(&s, b"a\n").await;

    assert!(success);
    assert_eq!(out, "a: 1\n");
}

#[tokio::test]
async fn missing_client_renders_error_lines() {
    let s = settings(&["sshmux", "--ssh-program", "/nonexistent/ssh", "uptime"]);
    let (success, out, err) = run(&s, b"h1\n").await;

    assert!(!success);
    assert_eq!(out, "");
    assert!(err.starts_with("h1: error: failed to start process"), "got {err:?}");
}

#[tokio::test]
async fn blank_and_invalid_lines_are_skipped() {
    let s = settings(&["sshmux", "--ssh-program", "echo", "-m", "exit", "id"]);
    let (success, out, _) = run(&s, b"\n   \nuser@\nhost\n").await;

    assert!(success);
    assert_eq!(out, "host: 0\n");
}

#[tokio::test]
async fn no_servers_is_not_a_success() {
    let s = settings(&["sshmux", "--ssh-program", "echo", "id"]);
    let (success, out, err) = run(&s, b"").await;

    assert!(!success);
    assert_eq!((out.as_str(), err.as_str()), ("", ""));
}
