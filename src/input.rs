// src/input.rs

//! Where server names come from: `--servers` and/or piped stdin.

use std::io::{Cursor, IsTerminal};

use tokio::io::{AsyncRead, AsyncReadExt, BufReader};

/// Line-oriented reader over all server names.
pub type ServerLines = BufReader<Box<dyn AsyncRead + Unpin + Send>>;

/// True if stdin is a pipe or file rather than an interactive terminal.
pub fn stdin_is_piped() -> bool {
    !std::io::stdin().is_terminal()
}

/// One line per comma-separated item.
pub fn comma_separated(items: &str) -> Cursor<Vec<u8>> {
    let mut text = items.replace(',', "\n");
    text.push('\n');
    Cursor::new(text.into_bytes())
}

/// Combine `--servers` items (first) with lines from `stdin` (after).
///
/// Returns `None` if neither source is present.
pub fn combined<R>(servers: Option<&str>, stdin: Option<R>) -> Option<ServerLines>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let items = servers.filter(|s| !s.is_empty()).map(comma_separated);

    let reader: Box<dyn AsyncRead + Unpin + Send> = match (items, stdin) {
        (Some(items), Some(stdin)) => Box::new(items.chain(stdin)),
        (Some(items), None) => Box::new(items),
        (None, Some(stdin)) => Box::new(stdin),
        (None, None) => return None,
    };

    Some(BufReader::new(reader))
}

/// [`combined`] over the process's own stdin, used only when it is piped.
pub fn from_process(servers: Option<&str>) -> Option<ServerLines> {
    let stdin = stdin_is_piped().then(tokio::io::stdin);
    combined(servers, stdin)
}
