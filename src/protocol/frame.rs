//! Frame decoding, encoding, and sentinel recognition.

use std::fmt::{Display, Formatter};

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::validate_role;
use crate::{AppError, Result};

/// Header tag identifying the controller side of a frame.
pub const CONTROLLER_TAG: &str = "CTL";

/// Payload of the frame written to every new connection.
pub const GREETING: &str = "This is Major Tom to Ground Control.";

/// Payload that closes the sending connection only.
pub const STOP_SENTINEL: &str = "STOP";

/// Payload that closes the sending connection and shuts the server down.
pub const TERMINATE_SENTINEL: &str = "TERMINATE";

/// Instrument identifier carried in every frame header.
///
/// Validated once at construction and immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Role(String);

impl Role {
    /// Build a role from its wire identifier.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the identifier cannot appear in a
    /// header (empty, contains a comma or whitespace, or equals `CTL`).
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        validate_role(&identifier)?;
        Ok(Self(identifier))
    }

    /// The wire identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side sent a frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Direction {
    /// Sent by the controller to the instrument server (`CTL,<ROLE>`).
    ToInstrument,
    /// Sent by the instrument server to the controller (`<ROLE>,<ROLE>`).
    ToController,
}

/// One decoded protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Instrument the frame is addressed to or sent from.
    pub role: String,
    /// Sending side.
    pub direction: Direction,
    /// Everything after the second comma, commas included.
    pub payload: String,
}

impl Frame {
    /// Build a frame from its parts.
    pub fn new(role: impl Into<String>, direction: Direction, payload: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            direction,
            payload: payload.into(),
        }
    }
}

/// Protocol-level payloads that are never dispatched as commands.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Sentinel {
    /// Close this connection.
    Stop,
    /// Close this connection and stop the server.
    Terminate,
}

/// Recognise a sentinel payload. Exact, case-sensitive match.
#[must_use]
pub fn sentinel(frame: &Frame) -> Option<Sentinel> {
    match frame.payload.as_str() {
        STOP_SENTINEL => Some(Sentinel::Stop),
        TERMINATE_SENTINEL => Some(Sentinel::Terminate),
        _ => None,
    }
}

/// Decode one line (without its terminator) into a [`Frame`].
///
/// The header is the first two comma-separated fields; the remainder is the
/// payload. `CTL,<ROLE>` is a controller frame. `<ROLE>,<ROLE>` and the
/// older `<ROLE>,CTL` are instrument frames.
///
/// # Errors
///
/// Returns `AppError::MalformedFrame` if the line is not UTF-8, has fewer
/// than two commas, or its header names no known direction.
pub fn decode(line: &[u8]) -> Result<Frame> {
    let text = std::str::from_utf8(line)
        .map_err(|err| AppError::MalformedFrame(format!("invalid utf-8: {err}")))?;

    let mut fields = text.splitn(3, ',');
    let (Some(first), Some(second), Some(payload)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(AppError::MalformedFrame(format!(
            "expected '<sender>,<recipient>,<payload>', got '{text}'"
        )));
    };

    let (role, direction) = match (first, second) {
        (CONTROLLER_TAG, CONTROLLER_TAG) => {
            return Err(AppError::MalformedFrame(
                "both header fields are the controller tag".into(),
            ));
        }
        (CONTROLLER_TAG, role) => (role, Direction::ToInstrument),
        (role, CONTROLLER_TAG) => (role, Direction::ToController),
        (sender, recipient) if sender == recipient => (sender, Direction::ToController),
        (sender, recipient) => {
            return Err(AppError::MalformedFrame(format!(
                "header '{sender},{recipient}' names no known direction"
            )));
        }
    };

    if role.is_empty() {
        return Err(AppError::MalformedFrame("empty role in header".into()));
    }

    Ok(Frame::new(role, direction, payload))
}

/// Encode a frame as `<h1>,<h2>,<payload>\n`.
///
/// # Errors
///
/// Returns `AppError::MalformedFrame` if `payload` contains a line break,
/// which the format cannot carry.
pub fn encode(role: &str, direction: Direction, payload: &str) -> Result<Bytes> {
    if payload.contains(['\n', '\r']) {
        return Err(AppError::MalformedFrame(
            "payload must not contain a line break".into(),
        ));
    }

    let (sender, recipient) = match direction {
        Direction::ToInstrument => (CONTROLLER_TAG, role),
        Direction::ToController => (role, role),
    };

    let mut line = BytesMut::with_capacity(sender.len() + recipient.len() + payload.len() + 3);
    line.put_slice(sender.as_bytes());
    line.put_u8(b',');
    line.put_slice(recipient.as_bytes());
    line.put_u8(b',');
    line.put_slice(payload.as_bytes());
    line.put_u8(b'\n');
    Ok(line.freeze())
}
