//! Server configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::profile::{InstrumentBackend, Profile};
use crate::protocol::frame::CONTROLLER_TAG;
use crate::{AppError, Result};

/// Read buffer size used by the acquisition scripts; kept as the default
/// line limit so existing controllers fit.
pub const DEFAULT_MAX_LINE_BYTES: usize = 4096;

fn default_bind_address() -> String {
    "127.0.0.1:7001".into()
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

fn default_drain_timeout_seconds() -> u64 {
    5
}

/// Configuration for one instrument server, parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    /// Instrument identifier placed in every frame header (e.g. `RUSKA`).
    pub role: String,
    /// `host:port` the listener binds to; the host may be a name.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Which command table the registry is populated with.
    pub profile: Profile,
    /// Facade implementation backing the command handlers.
    #[serde(default)]
    pub instrument: InstrumentBackend,
    /// Longest accepted inbound line, excluding the terminator.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Idle read timeout per connection; 0 disables it.
    #[serde(default)]
    pub read_timeout_seconds: u64,
    /// How long shutdown waits for in-flight sessions.
    #[serde(default = "default_drain_timeout_seconds")]
    pub drain_timeout_seconds: u64,
}

impl ServerConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Replace the role, e.g. from a command-line override.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the new role is invalid.
    pub fn set_role(&mut self, role: impl Into<String>) -> Result<()> {
        let role = role.into();
        validate_role(&role)?;
        self.role = role;
        Ok(())
    }

    /// Replace the bind address, e.g. from a command-line override.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the address is not `host:port`.
    pub fn set_bind_address(&mut self, address: impl Into<String>) -> Result<()> {
        let address = address.into();
        validate_bind_address(&address)?;
        self.bind_address = address;
        Ok(())
    }

    /// Idle read timeout, or `None` when disabled.
    #[must_use]
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_seconds > 0).then(|| Duration::from_secs(self.read_timeout_seconds))
    }

    /// Grace period for in-flight sessions after shutdown is requested.
    #[must_use]
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_seconds)
    }

    fn validate(&self) -> Result<()> {
        validate_role(&self.role)?;
        validate_bind_address(&self.bind_address)?;

        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Check that `role` can appear in a frame header.
///
/// # Errors
///
/// Returns `AppError::Config` when the role is empty, contains a comma or
/// whitespace, or collides with the controller tag.
pub fn validate_role(role: &str) -> Result<()> {
    if role.is_empty() {
        return Err(AppError::Config("role must not be empty".into()));
    }
    if role.contains(',') || role.chars().any(char::is_whitespace) {
        return Err(AppError::Config(format!(
            "role '{role}' must not contain commas or whitespace"
        )));
    }
    if role == CONTROLLER_TAG {
        return Err(AppError::Config(format!(
            "role must not be the reserved controller tag '{CONTROLLER_TAG}'"
        )));
    }
    Ok(())
}

/// Check that `address` is `host:port`. Host names are resolved when the
/// server binds.
fn validate_bind_address(address: &str) -> Result<()> {
    let invalid =
        |reason: &str| AppError::Config(format!("bind_address '{address}' invalid: {reason}"));

    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| invalid("expected host:port"))?;
    if host.is_empty() {
        return Err(invalid("empty host"));
    }
    if host.contains(char::is_whitespace) {
        return Err(invalid("host contains whitespace"));
    }
    port.parse::<u16>()
        .map_err(|err| invalid(&format!("port {err}")))?;
    Ok(())
}
