//! Constructors for commands used across tests.

use tokio::process::Command;
use sshmux::stream::RunnableCommand;

/// `program args...`
pub fn cmd(program: &str, args: &[&str]) -> RunnableCommand {
    let mut c = Command::new(program);
    c.args(args);
    RunnableCommand::new(c)
}

/// `sh -c script`
pub fn shell(script: &str) -> RunnableCommand {
    cmd("sh", &["-c", script])
}

pub fn echo(text: &str) -> RunnableCommand {
    cmd("echo", &[text])
}

/// A command that sleeps for `secs` (fractional seconds allowed).
pub fn sleep(secs: &str) -> RunnableCommand {
    cmd("sleep", &[secs])
}
