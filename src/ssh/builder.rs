// src/ssh/builder.rs

//! Build one SSH invocation per destination from a shared template.

use std::process::Stdio;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::ssh::Destination;
use crate::stream::{RunnableCommand, send_or_abort};

/// Program invoked when none is configured.
pub const DEFAULT_PROGRAM: &str = "ssh";

/// Template for the SSH command run against every server.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    /// Force a pseudo-terminal (`-tt`).
    pub tty: bool,

    /// User for destinations that carry none. If `None`, ssh picks one.
    pub user: Option<String>,

    /// Port for destinations that carry none. If `None`, ssh picks one.
    pub port: Option<u16>,

    /// Remote command line.
    pub command: String,

    /// SSH client binary.
    pub program: String,
}

/// A runnable command together with the server text it was built from.
#[derive(Debug)]
pub struct LinkedCommand {
    pub server: String,
    pub command: RunnableCommand,
}

impl CommandBuilder {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            tty: false,
            user: None,
            port: None,
            command: command.into(),
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Arguments passed to the SSH client (without the program itself).
    pub fn args_for(&self, dst: &Destination) -> Vec<String> {
        let mut args = Vec::with_capacity(6);

        if let Some(port) = dst.port.or(self.port) {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        // `-t` alone is not enough since stdin is not forwarded.
        if self.tty {
            args.push("-tt".to_string());
        }

        // A user on the destination is rendered as user@host and wins.
        if dst.user.is_none() {
            if let Some(user) = &self.user {
                args.push("-l".to_string());
                args.push(user.clone());
            }
        }

        args.push(dst.without_port());
        args.push(self.command.clone());
        args
    }

    pub fn command_for(&self, dst: &Destination) -> RunnableCommand {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args_for(dst)).stdin(Stdio::null());
        RunnableCommand::new(cmd)
    }

    /// Build a command for every server line read from `reader`.
    ///
    /// Lines are trimmed and decoded lossily; blank lines and lines that are
    /// not a destination are skipped. The channel closes at EOF, on a read error, or once
    /// `token` is cancelled.
    pub fn from_lines<R>(&self, reader: R, token: CancellationToken) -> mpsc::Receiver<LinkedCommand>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<LinkedCommand>(1);
        let builder = self.clone();

        tokio::spawn(async move {
            let mut reader = reader;
            let mut buf = Vec::new();

            loop {
                buf.clear();
                let read = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    read = reader.read_until(b'\n', &mut buf) => read,
                };

                // Lines are raw bytes; a non-UTF-8 line must not end the list.
                let server = match read {
                    Ok(0) => break,
                    Ok(_) => String::from_utf8_lossy(&buf).trim().to_string(),
                    Err(e) => {
                        warn!(error = %e, "failed to read server list");
                        break;
                    }
                };

                if server.is_empty() {
                    continue;
                }

                let Some(dst) = Destination::parse(&server) else {
                    warn!(%server, "not a valid destination; skipping");
                    continue;
                };

                let linked = LinkedCommand {
                    command: builder.command_for(&dst),
                    server,
                };
                debug!(server = %linked.server, command = %linked.command.id(), "built command");

                if !send_or_abort(&token, &tx, linked).await {
                    break;
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(builder: &CommandBuilder, dst: Destination) -> Vec<String> {
        builder.args_for(&dst)
    }

    #[test]
    fn plain_host_and_command() {
        let b = CommandBuilder::new("command");
        assert_eq!(args(&b, Destination::new("host")), vec!["host", "command"]);
    }

    #[test]
    fn default_user_and_port_are_applied() {
        let mut b = CommandBuilder::new("command");
        b.user = Some("user".into());
        assert_eq!(args(&b, Destination::new("host")), vec!["-l", "user", "host", "command"]);

        let mut b = CommandBuilder::new("command");
        b.port = Some(1234);
        assert_eq!(args(&b, Destination::new("host")), vec!["-p", "1234", "host", "command"]);
    }

    #[test]
    fn destination_user_and_port_win() {
        let mut b = CommandBuilder::new("command");
        b.user = Some("user".into());
        assert_eq!(
            args(&b, Destination::new("host").with_user("host-user")),
            vec!["host-user@host", "command"]
        );

        let mut b = CommandBuilder::new("command");
        b.port = Some(1234);
        assert_eq!(
            args(&b, Destination::new("host").with_port(4567)),
            vec!["-p", "4567", "host", "command"]
        );
    }

    #[test]
    fn tty_forces_pseudo_terminal() {
        let mut b = CommandBuilder::new("uptime");
        b.tty = true;
        b.port = Some(22);
        assert_eq!(
            args(&b, Destination::new("host")),
            vec!["-p", "22", "-tt", "host", "uptime"]
        );
    }

    #[test]
    fn command_for_uses_program() {
        let b = CommandBuilder::new("whoami");
        let cmd = b.command_for(&Destination::new("host1"));
        assert_eq!(cmd.argv(), vec!["ssh", "host1", "whoami"]);
    }

    #[tokio::test]
    async fn builds_one_command_per_line() {
        let b = CommandBuilder::new("whoami");
        let reader: &'static [u8] = b"host1\n\n  host2  \n";
        let mut rx = b.from_lines(reader, CancellationToken::new());

        let mut produced = Vec::new();
        while let Some(linked) = rx.recv().await {
            produced.push((linked.server, linked.command.argv()));
        }

        assert_eq!(
            produced,
            vec![
                ("host1".to_string(), vec!["ssh".to_string(), "host1".into(), "whoami".into()]),
                ("host2".to_string(), vec!["ssh".to_string(), "host2".into(), "whoami".into()]),
            ]
        );
    }

    #[tokio::test]
    async fn non_utf8_line_does_not_end_the_list() {
        let b = CommandBuilder::new("id");
        let reader: &'static [u8] = b"host1\nbad\xff\nhost2\nhost3";
        let mut rx = b.from_lines(reader, CancellationToken::new());

        let mut servers = Vec::new();
        while let Some(linked) = rx.recv().await {
            servers.push(linked.server);
        }

        assert_eq!(servers, vec!["host1", "bad\u{fffd}", "host2", "host3"]);
    }

    #[tokio::test]
    async fn cancelled_reader_yields_nothing() {
        let token = CancellationToken::new();
        token.cancel();

        let reader: &'static [u8] = b"host1\nhost2\n";
        let mut rx = CommandBuilder::new("id").from_lines(reader, token);
        assert!(rx.recv().await.is_none());
    }
}
