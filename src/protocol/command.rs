//! Command parsing and reply formatting.

use std::fmt::{Display, Formatter};

use crate::{AppError, Result};

/// Prefix of every command reply, kept for controllers that match on it.
pub const REPLY_PREFIX: &str = "Evaluated Command: ";

/// A command name with its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Registry key.
    pub name: String,
    /// Comma-separated arguments following the name, in order.
    pub args: Vec<String>,
}

impl Command {
    /// Parse `name[,arg...]` from a frame payload.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MalformedFrame` if the command name is empty.
    pub fn parse(payload: &str) -> Result<Self> {
        let mut parts = payload.split(',');
        let name = parts.next().unwrap_or_default();
        if name.is_empty() {
            return Err(AppError::MalformedFrame("empty command name".into()));
        }
        Ok(Self {
            name: name.to_owned(),
            args: parts.map(str::to_owned).collect(),
        })
    }
}

/// Outcome status carried in a reply.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Status {
    /// The handler completed.
    Ok,
    /// The frame, lookup, arguments, or handler failed.
    Error,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Self::Ok => "[OK]",
            Self::Error => "[ERROR]",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => f.write_str("OK"),
            Self::Error => f.write_str("ERROR"),
        }
    }
}

/// Result of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    /// Success or failure.
    pub status: Status,
    /// Handler output or failure cause.
    pub message: String,
}

impl CommandResult {
    /// Successful result with handler output.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
        }
    }

    /// Failed result with a cause.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            message: message.into(),
        }
    }

    /// Failed result describing `err`.
    #[must_use]
    pub fn from_error(err: &AppError) -> Self {
        Self::error(err.to_string())
    }

    /// Whether the status is [`Status::Ok`].
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    /// Parse a reply payload produced for `sent_payload`.
    ///
    /// Returns `None` when `reply` is not a reply to that payload.
    #[must_use]
    pub fn parse_reply(reply: &str, sent_payload: &str) -> Option<Self> {
        let rest = reply
            .strip_prefix(REPLY_PREFIX)?
            .strip_prefix(&flatten(sent_payload))?
            .strip_prefix(' ')?;

        [Status::Ok, Status::Error].into_iter().find_map(|status| {
            let message = rest.strip_prefix(status.tag())?;
            let message = if message.is_empty() {
                ""
            } else {
                message.strip_prefix(' ')?
            };
            Some(Self {
                status,
                message: message.to_owned(),
            })
        })
    }
}

/// Reply payload for a dispatched line:
/// `Evaluated Command: <payload> [OK|ERROR] <message>`.
///
/// Line breaks in either part are replaced with spaces so the reply stays a
/// single frame.
#[must_use]
pub fn reply_text(payload: &str, result: &CommandResult) -> String {
    let mut text = format!("{REPLY_PREFIX}{} {}", flatten(payload), result.status.tag());
    if !result.message.is_empty() {
        text.push(' ');
        text.push_str(&flatten(&result.message));
    }
    text
}

fn flatten(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}
