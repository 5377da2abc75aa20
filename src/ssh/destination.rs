// src/ssh/destination.rs

use std::fmt;

/// An SSH target: `[user@]host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Destination {
    pub host: String,
    pub user: Option<String>,
    pub port: Option<u16>,
}

impl Destination {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::default()
        }
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Parse `[user@]host[:port]`.
    ///
    /// - The first `@` separates the user from the rest.
    /// - The first `:` after that separates host and port.
    /// - A port that is not a number in `1..=65535` is not a port; the text
    ///   stays part of the host (`foo:bar`, `bar:123123123`).
    ///
    /// Returns `None` for empty input or an empty host.
    pub fn parse(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        let (user, rest) = match text.split_once('@') {
            Some((user, rest)) => (Some(user), rest),
            None => (None, text),
        };

        let (host, port) = match rest.split_once(':') {
            Some((host, port)) => match parse_port(port) {
                Some(port) => (host, Some(port)),
                None => (rest, None),
            },
            None => (rest, None),
        };

        if host.is_empty() {
            return None;
        }

        Some(Self {
            host: host.to_string(),
            user: user.filter(|u| !u.is_empty()).map(str::to_string),
            port,
        })
    }

    /// `[user@]host`, even if a port is set.
    pub fn without_port(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }
}

fn parse_port(text: &str) -> Option<u16> {
    text.parse::<u16>().ok().filter(|port| *port > 0)
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.is_empty() {
            return Ok(());
        }

        f.write_str(&self.without_port())?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
