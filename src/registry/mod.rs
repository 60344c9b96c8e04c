//! Closed command registry.
//!
//! The registry is the only path from a received line to the instrument:
//! a fixed table of `name → (arity, handler)` built at startup from the
//! configured [`Profile`]. Names not in the table are answered with an
//! error and never reach the facade.
//!
//! Handler calls are serialised across all sessions by the shared
//! instrument lock, held for the whole call.

pub mod args;
pub mod camera;
pub mod column;
pub mod microscope;
pub mod screen;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::instrument::Instrument;
use crate::profile::Profile;
use crate::protocol::{Command, CommandResult};
use crate::AppError;

/// Handler signature: positional arguments plus exclusive facade access.
///
/// The returned string becomes the reply message.
pub type Handler = fn(&[String], &mut dyn Instrument) -> crate::Result<String>;

/// Instrument facade shared by every session.
pub type SharedInstrument = Arc<Mutex<Box<dyn Instrument>>>;

/// Wrap a facade for sharing across sessions.
#[must_use]
pub fn share(instrument: Box<dyn Instrument>) -> SharedInstrument {
    Arc::new(Mutex::new(instrument))
}

/// Argument counts a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many.
    Exact(usize),
    /// Between the two bounds, inclusive.
    Between(usize, usize),
    /// This many or more.
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` arguments are acceptable.
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == n,
            Self::Between(min, max) => (min..=max).contains(&count),
            Self::AtLeast(min) => count >= min,
        }
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{n}"),
            Self::Between(min, max) => write!(f, "{min} to {max}"),
            Self::AtLeast(min) => write!(f, "at least {min}"),
        }
    }
}

/// One registered command.
#[derive(Clone, Copy)]
pub struct CommandSpec {
    /// Argument counts the handler accepts.
    pub arity: Arity,
    /// Function invoked against the facade.
    pub handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

/// Name-keyed command table.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    commands: BTreeMap<String, CommandSpec>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The command table for `profile`.
    #[must_use]
    pub fn for_profile(profile: Profile) -> Self {
        let mut registry = Self::new();
        match profile {
            Profile::Microscope => microscope::register(&mut registry),
            Profile::Camera => camera::register(&mut registry),
        }
        registry
    }

    /// Add `name` taking exactly `arity` arguments, replacing any earlier
    /// entry.
    pub fn register(&mut self, name: impl Into<String>, arity: usize, handler: Handler) {
        self.register_with_arity(name, Arity::Exact(arity), handler);
    }

    /// Add `name` with an optional or variadic argument list.
    pub fn register_with_arity(&mut self, name: impl Into<String>, arity: Arity, handler: Handler) {
        self.commands
            .insert(name.into(), CommandSpec { arity, handler });
    }

    /// Exact, case-sensitive lookup.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    /// Registered command names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// Number of registered commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Run `command` against the shared facade.
    ///
    /// Never fails: unknown names, arity mismatches, handler errors and
    /// handler panics all come back as an error result. The facade lock is
    /// taken only once the command has been validated.
    pub async fn dispatch(&self, command: &Command, instrument: &SharedInstrument) -> CommandResult {
        let Some(spec) = self.lookup(&command.name) else {
            warn!(command = %command.name, "unknown command");
            return CommandResult::from_error(&AppError::UnknownCommand(command.name.clone()));
        };

        if !spec.arity.accepts(command.args.len()) {
            warn!(
                command = %command.name,
                expected = %spec.arity,
                received = command.args.len(),
                "wrong argument count"
            );
            return CommandResult::error(format!(
                "{} expects {} argument(s), got {}",
                command.name,
                spec.arity,
                command.args.len()
            ));
        }

        let handler = spec.handler;
        let args = command.args.clone();
        let mut guard = Arc::clone(instrument).lock_owned().await;
        let outcome = tokio::task::spawn_blocking(move || handler(&args, &mut **guard)).await;

        let result = match outcome {
            Ok(Ok(message)) => CommandResult::ok(message),
            Ok(Err(err)) => CommandResult::from_error(&err),
            Err(err) => CommandResult::from_error(&AppError::Handler(format!(
                "{} aborted: {err}",
                command.name
            ))),
        };

        if result.is_ok() {
            info!(command = %command.name, "command completed");
        } else {
            warn!(command = %command.name, error = %result.message, "command failed");
        }
        result
    }
}
