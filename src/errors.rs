//! Error types shared across the application.

use std::fmt::{Display, Formatter};
use std::io::ErrorKind;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// A received line could not be decoded into a frame.
    MalformedFrame(String),
    /// The command name is not present in the registry.
    UnknownCommand(String),
    /// A command handler failed or panicked.
    Handler(String),
    /// The instrument facade rejected or failed a call.
    Instrument(String),
    /// An inbound line exceeded the configured maximum length.
    LineTooLong(String),
    /// The peer reset or aborted the connection, or a socket write failed.
    Connection(String),
    /// The listening socket could not be bound.
    Bind(String),
    /// The peer stayed silent longer than the configured read timeout.
    Timeout(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::MalformedFrame(msg) => write!(f, "malformed frame: {msg}"),
            Self::UnknownCommand(name) => write!(f, "unknown command: {name}"),
            Self::Handler(msg) => write!(f, "handler fault: {msg}"),
            Self::Instrument(msg) => write!(f, "instrument: {msg}"),
            Self::LineTooLong(msg) => write!(f, "line too long: {msg}"),
            Self::Connection(msg) => write!(f, "connection: {msg}"),
            Self::Bind(msg) => write!(f, "bind: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    /// Resets and aborts by the peer become [`AppError::Connection`]; every
    /// other I/O failure is [`AppError::Io`].
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                Self::Connection(err.to_string())
            }
            _ => Self::Io(err.to_string()),
        }
    }
}
